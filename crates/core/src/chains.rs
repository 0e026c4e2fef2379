use crate::types::Category;
use std::collections::HashMap;

/// Category -> ordered list of candidate models.
#[derive(Debug, Clone)]
pub struct ModelChains {
    chains: HashMap<Category, Vec<String>>,
}

impl ModelChains {
    pub fn new(chains: HashMap<Category, Vec<String>>) -> Self {
        Self { chains }
    }

    /// The chain for `category`, or the `unknown` chain when it is unmapped or empty.
    pub fn resolve(&self, category: Category) -> &[String] {
        match self.chains.get(&category) {
            Some(models) if !models.is_empty() => models.as_slice(),
            _ => self
                .chains
                .get(&Category::Unknown)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    pub fn default_table() -> HashMap<Category, Vec<String>> {
        let mut table = HashMap::new();
        table.insert(
            Category::ServerOperation,
            chain(&["gpt-oss:120b", "qwen3-next:80b"]),
        );
        table.insert(
            Category::CodeGeneration,
            chain(&["devstral-2:123b-cloud", "qwen3-coder:480b-cloud"]),
        );
        table.insert(
            Category::Explanatory,
            chain(&["gemini-3-flash-preview:cloud", "mistral-large-3"]),
        );
        table.insert(Category::Unknown, chain(&["ministral-3:14b", "glm-4.6"]));
        table
    }
}

fn chain(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| m.to_string()).collect()
}

impl Default for ModelChains {
    fn default() -> Self {
        Self::new(Self::default_table())
    }
}

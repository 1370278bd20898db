//! API endpoint handlers, one module per feature.

pub mod chatbot;
pub mod disease;
pub mod health;
pub mod info;
pub mod symptoms;
pub mod treatment;

#[cfg(test)]
pub(crate) mod test_support;

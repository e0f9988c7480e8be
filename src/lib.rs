//! City router - agent-routing workflow over US city data
//!
//! A language model decides, per question, whether to answer directly or
//! to call tools (SQL over `city_stats`, search over city documents),
//! possibly several at once, before composing the final answer.

pub mod api;
pub mod cities;
pub mod config;
pub mod llm;
pub mod tools;
pub mod workflow;

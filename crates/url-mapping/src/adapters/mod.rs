pub mod arxiv;
pub mod generic;

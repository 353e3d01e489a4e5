mod common;
mod mutations;
mod retrieval;

pub mod retrieval;

pub use retrieval::MoiService;

pub mod training_api;

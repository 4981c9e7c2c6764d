pub mod material_batch;

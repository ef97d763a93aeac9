pub mod knn;
pub mod model;

pub type Embedding = Vec<f32>;
pub type Embeddings = Vec<Embedding>;

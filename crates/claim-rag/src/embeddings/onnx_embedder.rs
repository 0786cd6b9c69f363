//! ONNX-based sentence embeddings
//!
//! Runs all-MiniLM-L6-v2 (384 dimensions) locally. Model and tokenizer are
//! fetched from HuggingFace into the cache directory on first start.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::EmbeddingProvider;

/// ONNX-based text embedder.
///
/// Inference runs on the blocking thread pool so async callers and their
/// deadlines are not stalled while the model runs.
pub struct OnnxEmbedder {
    model: Arc<OnnxModel>,
    /// Model name, used as the model identity
    name: String,
}

/// Loaded session and tokenizer, shared with blocking inference tasks
struct OnnxModel {
    /// ONNX Runtime session; inference needs exclusive access
    session: Mutex<Session>,
    /// HuggingFace tokenizer
    tokenizer: Tokenizer,
    /// Embedding dimensions
    dimensions: usize,
    /// Maximum sequence length
    max_length: usize,
    /// Batch size
    batch_size: usize,
}

/// Token ids for one batch, padded to a common length
struct EncodedBatch {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
    batch_size: usize,
    seq_len: usize,
}

impl OnnxEmbedder {
    /// Load (downloading if needed) the model configured in `config`
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        let model_dir = config.cache_dir.join(&config.model);
        std::fs::create_dir_all(&model_dir).map_err(|e| {
            Error::config(format!(
                "Failed to create model cache '{}': {}",
                model_dir.display(),
                e
            ))
        })?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            download(&config.model, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download(&config.model, "tokenizer.json", &tokenizer_path).await?;
        }

        let session = Session::builder()
            .map_err(|e| {
                Error::model_unavailable(format!("Failed to create session builder: {}", e))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                Error::model_unavailable(format!("Failed to set optimization level: {}", e))
            })?
            .with_intra_threads(4)
            .map_err(|e| Error::model_unavailable(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::model_unavailable(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::model_unavailable(format!("Failed to load tokenizer: {}", e)))?;

        tracing::info!("ONNX embedder initialized successfully");

        Ok(Self {
            model: Arc::new(OnnxModel {
                session: Mutex::new(session),
                tokenizer,
                dimensions: config.dimensions,
                max_length: config.max_length,
                batch_size: config.batch_size.max(1),
            }),
            name: config.model.clone(),
        })
    }

    /// Embed owned texts on the blocking pool
    async fn embed_owned(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        run_blocking(move || {
            let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
            model.embed_texts(&texts)
        })
        .await
    }
}

impl OnnxModel {
    /// Embed multiple texts synchronously
    fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let encoded = self.encode(batch)?;
            all_embeddings.extend(self.run(&encoded)?);
        }
        Ok(all_embeddings)
    }

    fn encode(&self, texts: &[&str]) -> Result<EncodedBatch> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::model_unavailable(format!("Tokenization failed: {}", e)))?;

        let batch_size = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length);

        let mut batch = EncodedBatch {
            input_ids: vec![0; batch_size * seq_len],
            attention_mask: vec![0; batch_size * seq_len],
            token_type_ids: vec![0; batch_size * seq_len],
            batch_size,
            seq_len,
        };

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(seq_len) {
                let at = i * seq_len + j;
                batch.input_ids[at] = ids[j] as i64;
                batch.attention_mask[at] = mask[j] as i64;
                batch.token_type_ids[at] = types[j] as i64;
            }
        }

        Ok(batch)
    }

    fn run(&self, batch: &EncodedBatch) -> Result<Vec<Vec<f32>>> {
        let shape = vec![batch.batch_size, batch.seq_len];
        let tensor = |data: &[i64], what: &str| {
            Tensor::from_array((shape.clone(), data.to_vec().into_boxed_slice())).map_err(|e| {
                Error::model_unavailable(format!("{} tensor creation failed: {}", what, e))
            })
        };

        let inputs = vec![
            ("input_ids", tensor(&batch.input_ids, "Input")?.into_dyn()),
            ("attention_mask", tensor(&batch.attention_mask, "Attention mask")?.into_dyn()),
            ("token_type_ids", tensor(&batch.token_type_ids, "Token type")?.into_dyn()),
        ];

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs)
            .map_err(|e| Error::model_unavailable(format!("Inference failed: {}", e)))?;

        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::model_unavailable("No output tensor"))?;

        let (tensor_shape, hidden) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::model_unavailable(format!("Failed to extract tensor: {}", e)))?;

        let hidden_size = tensor_shape
            .iter()
            .nth(2)
            .map(|&d| d as usize)
            .unwrap_or(self.dimensions);

        if hidden_size != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: hidden_size,
            });
        }

        Ok(mean_pool_normalized(
            hidden,
            &batch.attention_mask,
            batch.batch_size,
            batch.seq_len,
            hidden_size,
        ))
    }
}

/// Run CPU-bound model work on the blocking pool
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::model_unavailable(format!("Embedding task failed: {}", e)))?
}

/// Attention-masked mean over token states, then L2 normalization.
///
/// `hidden` has shape `(batch_size, seq_len, hidden_size)`, row-major.
fn mean_pool_normalized(
    hidden: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let mut sum = vec![0.0f32; hidden_size];
        let mut count = 0.0f32;

        for j in 0..seq_len {
            let mask = attention_mask[i * seq_len + j] as f32;
            if mask <= 0.0 {
                continue;
            }
            let offset = (i * seq_len + j) * hidden_size;
            if let Some(token) = hidden.get(offset..offset + hidden_size) {
                for (acc, value) in sum.iter_mut().zip(token) {
                    *acc += value * mask;
                }
                count += mask;
            }
        }

        if count > 0.0 {
            for val in &mut sum {
                *val /= count;
            }
        }

        let norm: f32 = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut sum {
                *val /= norm;
            }
        }

        embeddings.push(sum);
    }

    embeddings
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_owned(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::model_unavailable("Empty embedding result"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_owned(texts.to_vec()).await
    }

    fn dimensions(&self) -> usize {
        self.model.dimensions
    }

    fn model(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Fetch one sentence-transformers artifact from HuggingFace
async fn download(model_name: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!(
        "https://huggingface.co/sentence-transformers/{}/resolve/main/{}",
        model_name, file
    );

    tracing::info!("Downloading {} from: {}", file, url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::model_unavailable(format!("Failed to download {}: {}", file, e)))?;

    if !response.status().is_success() {
        return Err(Error::model_unavailable(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::model_unavailable(format!("Failed to read {} bytes: {}", file, e)))?;

    tokio::fs::write(path, &bytes).await?;

    tracing::info!("Downloaded {} ({} bytes)", file, bytes.len());

    Ok(())
}

//! Local ONNX Runtime embedding provider.
//!
//! Implements [`EmbeddingProvider`] for sentence-transformer style models via
//! `ort`. Handles tokenization, inference, pooling, and optional L2 normalization.
//! The model is loaded lazily on the first call and kept until [`dispose`] or drop.
//!
//! [`dispose`]: EmbeddingProvider::dispose

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::pooling::{pool, Pooling};
use super::{DimensionGuard, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{Result, VellumError};
use crate::similarity::l2_normalize;

/// Session and tokenizer, created together on first use.
struct LoadedModel {
    session: Session,
    tokenizer: Tokenizer,
}

/// Local ONNX-based embedding provider.
pub struct LocalEmbeddingProvider {
    model_dir: PathBuf,
    model_id: String,
    pooling: Pooling,
    normalize: bool,
    max_seq_len: usize,
    model: Mutex<Option<LoadedModel>>,
    guard: DimensionGuard,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex.
// The Mutex guarantees exclusive access during run().
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    /// Configure the provider. No files are read until the first embedding call.
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            model_dir: config.model_dir(),
            model_id: config.model.clone(),
            pooling: config.pooling,
            normalize: config.normalize,
            max_seq_len: config.max_seq_len,
            model: Mutex::new(None),
            guard: DimensionGuard::default(),
        }
    }

    /// Whether the model is currently loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.lock().map(|m| m.is_some()).unwrap_or(false)
    }

    fn load(&self) -> Result<LoadedModel> {
        let started = Instant::now();
        let model_path = self.model_dir.join("model.onnx");
        let tokenizer_path = self.model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(VellumError::Initialization(format!(
                "ONNX model not found at {}. Run `vellum model download` first.",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(VellumError::Initialization(format!(
                "Tokenizer not found at {}. Run `vellum model download` first.",
                tokenizer_path.display()
            )));
        }

        let init_err = |e: ort::Error| VellumError::Initialization(e.to_string());
        let session = Session::builder()
            .map_err(init_err)?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(init_err)?
            .with_intra_threads(4)
            .map_err(init_err)?
            .commit_from_file(&model_path)
            .map_err(|e| VellumError::Initialization(format!("failed to load ONNX model: {e}")))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| VellumError::Initialization(format!("failed to load tokenizer: {e}")))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: self.max_seq_len,
                ..Default::default()
            }))
            .map_err(|e| VellumError::Initialization(format!("failed to set truncation: {e}")))?;

        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!(
            model = %model_path.display(),
            pooling = %self.pooling,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ONNX model loaded"
        );

        Ok(LoadedModel { session, tokenizer })
    }

    fn infer(&self, model: &mut LoadedModel, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let infer_err = |e: ort::Error| VellumError::Inference(e.to_string());

        // Step 1: Tokenize
        let encodings = model
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| VellumError::Inference(format!("tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        // Step 2: Build flat input tensors as i64
        let mut input_ids_flat = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask_flat = Vec::with_capacity(batch_size * seq_len);

        for encoding in &encodings {
            input_ids_flat.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask_flat.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids_tensor =
            Tensor::from_array((shape.clone(), input_ids_flat.into_boxed_slice()))
                .map_err(infer_err)?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask_flat.clone().into_boxed_slice()))
                .map_err(infer_err)?;
        // token_type_ids: all zeros (single sentence, no segment B)
        let token_type_ids = vec![0i64; batch_size * seq_len];
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice())).map_err(infer_err)?;

        // Step 3: Run ONNX inference
        let outputs = model
            .session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            })
            .map_err(infer_err)?;

        // Step 4: Extract token embeddings, shape [batch, seq_len, hidden]
        // The output name varies by ONNX export. Try common names, fall back to index 0.
        let token_emb_value = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (out_shape, data) = token_emb_value
            .try_extract_tensor::<f32>()
            .map_err(|e| VellumError::Inference(format!("failed to extract token embeddings: {e}")))?;

        let dims: &[i64] = &out_shape;
        if dims.len() != 3 || dims[0] as usize != batch_size || dims[1] as usize != seq_len {
            return Err(VellumError::Inference(format!(
                "unexpected token embedding shape {dims:?}, expected [{batch_size}, {seq_len}, hidden]"
            )));
        }
        let hidden_dim = dims[2] as usize;

        // Step 5: Pool, then optionally L2 normalize
        let pooled = pool(
            self.pooling,
            data,
            &attention_mask_flat,
            batch_size,
            seq_len,
            hidden_dim,
        );

        Ok(if self.normalize {
            pooled.iter().map(|v| l2_normalize(v)).collect()
        } else {
            pooled
        })
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut slot = self
            .model
            .lock()
            .map_err(|e| VellumError::Inference(format!("model lock poisoned: {e}")))?;

        if slot.is_none() {
            *slot = Some(self.load()?);
        }
        let model = slot
            .as_mut()
            .ok_or_else(|| VellumError::Initialization("model slot empty after load".into()))?;

        let started = Instant::now();
        let vectors = self.infer(model, texts)?;
        tracing::debug!(
            batch = texts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedded batch"
        );

        self.guard.check(&vectors)?;
        Ok(vectors)
    }

    fn dimensions(&self) -> Option<usize> {
        self.guard.get()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn is_semantic(&self) -> bool {
        true
    }

    fn dispose(&self) {
        if let Ok(mut slot) = self.model.lock() {
            if slot.take().is_some() {
                tracing::info!(model = %self.model_id, "ONNX model released");
            }
        }
    }
}

use async_compression::tokio::write::GzipEncoder;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::io;
use tokio::io::AsyncWriteExt;

/// Serialises `value` to JSON, gzips it and wraps the result in standard
/// base64, the framing the desktop client expects for chart data.
pub async fn gzip_base64<T: Serialize + ?Sized>(value: &T) -> io::Result<String> {
    let json = serde_json::to_vec(value)?;
    let mut encoder = GzipEncoder::new(Vec::with_capacity(json.len() / 4));
    encoder.write_all(&json).await?;
    encoder.shutdown().await?;
    Ok(STANDARD.encode(encoder.into_inner()))
}

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::core::ExtractError;
use crate::ocr::{OcrBlock, OcrEngine, OcrPage};

#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub python: PathBuf,
    pub script: PathBuf,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            script: PathBuf::from("ocr/bridge/ocr_bridge.py"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    blocks: Vec<OcrBlock>,
    #[serde(default)]
    error: Option<String>,
}

/// OCR backed by a long-lived Python process.
///
/// The process loads its model once; it is spawned on the first call to
/// [`OcrEngine::recognize`] and reused until the engine is dropped. A failed
/// start is remembered so later calls fail immediately.
pub struct BridgeOcrEngine {
    settings: OcrSettings,
    process: OnceCell<std::result::Result<Mutex<BridgeProcess>, String>>,
}

impl BridgeOcrEngine {
    pub fn new(settings: OcrSettings) -> Self {
        Self {
            settings,
            process: OnceCell::new(),
        }
    }

    fn process(&self) -> Result<&Mutex<BridgeProcess>> {
        let started = self.process.get_or_init(|| {
            BridgeProcess::spawn(&self.settings)
                .map(Mutex::new)
                .map_err(|err| format!("{err:#}"))
        });
        started
            .as_ref()
            .map_err(|message| ExtractError::Ocr(message.clone()).into())
    }
}

impl OcrEngine for BridgeOcrEngine {
    fn recognize(&self, image: &RgbImage) -> Result<OcrPage> {
        let process = self.process()?;

        let file = tempfile::Builder::new()
            .prefix("eicr-ocr-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(file.path(), ImageFormat::Png)
            .with_context(|| "failed to write OCR input image")?;

        let mut process = process
            .lock()
            .map_err(|_| anyhow::anyhow!("OCR bridge lock poisoned"))?;
        process.request(file.path())
    }
}

struct BridgeProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl BridgeProcess {
    fn spawn(settings: &OcrSettings) -> Result<Self> {
        if !settings.script.exists() {
            anyhow::bail!("OCR bridge script not found: {}", settings.script.display());
        }

        tracing::info!(script = %settings.script.display(), "starting OCR bridge");
        let mut child = Command::new(&settings.python)
            .arg(&settings.script)
            .arg("--serve")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| "failed to invoke python OCR bridge")?;

        let stdin = child.stdin.take().context("OCR bridge stdin unavailable")?;
        let stdout = child.stdout.take().context("OCR bridge stdout unavailable")?;
        let mut process = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        // The bridge prints one line once its model is loaded.
        let ready = process.read_line()?;
        let ready: serde_json::Value =
            serde_json::from_str(&ready).with_context(|| "failed to parse OCR bridge handshake")?;
        if let Some(error) = ready.get("error").and_then(|e| e.as_str()) {
            anyhow::bail!("OCR bridge failed to start: {error}");
        }
        Ok(process)
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.stdout.read_line(&mut line)?;
        if read == 0 {
            anyhow::bail!("OCR bridge exited unexpectedly");
        }
        Ok(line)
    }

    fn request(&mut self, image_path: &Path) -> Result<OcrPage> {
        let request = serde_json::json!({ "image": image_path });
        writeln!(self.stdin, "{request}")?;
        self.stdin.flush()?;

        let line = self.read_line()?;
        let response: BridgeResponse =
            serde_json::from_str(&line).with_context(|| "failed to parse OCR JSON response")?;
        if let Some(error) = response.error {
            anyhow::bail!("OCR bridge failed: {error}");
        }
        Ok(OcrPage {
            blocks: response.blocks,
        })
    }
}

impl Drop for BridgeProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

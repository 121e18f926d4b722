use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

pub struct ModelDownloader {
    models_dir: PathBuf,
}

impl ModelDownloader {
    pub fn new(models_dir: PathBuf) -> Self {
        ModelDownloader { models_dir }
    }

    pub fn ensure_model_exists(&self, model_name: &str) -> Result<()> {
        let model_path = self.models_dir.join(format!("ggml-{}.bin", model_name));

        if model_path.exists() {
            println!("✓ Model found: {}", model_path.display());
            return Ok(());
        }

        println!("Model not found, downloading...");
        self.download_model(model_name)?;

        Ok(())
    }

    fn download_model(&self, model_name: &str) -> Result<()> {
        fs::create_dir_all(&self.models_dir).context("Failed to create models directory")?;

        let model_filename = format!("ggml-{}.bin", model_name);
        let model_path = self.models_dir.join(&model_filename);
        let url = format!("{}/{}", BASE_URL, model_filename);

        println!("Downloading {} model...", model_name);
        println!("URL: {}", url);
        println!("This may take a few minutes depending on your connection...");

        self.download_file(&url, &model_path)?;

        println!("✓ Model downloaded successfully!");

        Ok(())
    }

    fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        let output = std::process::Command::new("curl")
            .arg("-L") // Follow redirects
            .arg("-#") // Show progress bar
            .arg("-o")
            .arg(dest)
            .arg(url)
            .status()
            .context("Failed to execute curl")?;

        if !output.success() {
            anyhow::bail!("Failed to download file from {}", url);
        }

        Ok(())
    }

    pub fn list_available_models() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("tiny.en", "~75MB", "Fastest, good quality"),
            ("base.en", "~142MB", "Recommended - best balance"),
            ("small.en", "~466MB", "Better quality, slower"),
            ("medium.en", "~1.5GB", "Highest quality, slowest"),
            ("tiny", "~75MB", "Multilingual, fastest"),
            ("base", "~142MB", "Multilingual, balanced"),
            ("small", "~466MB", "Multilingual, better quality"),
            ("medium", "~1.5GB", "Multilingual, high quality"),
        ]
    }
}

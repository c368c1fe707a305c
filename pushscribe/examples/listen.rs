//! 按住说话演示
//!
//! 按住组合键录音，松开后把录音保存为临时 WAV 文件并打印路径
//!
//! 运行: cargo run --example listen --features cpal-input,global-listener -- [config.json]

use std::sync::Arc;

use async_trait::async_trait;
use pushscribe::audio::{list_input_devices, CpalSource};
use pushscribe::config::AppConfig;
use pushscribe::dictation::{Collaborators, DictationController, DictationEvent};
use pushscribe::hotkey::platform::RdevListener;
use pushscribe::session::TokioTimer;
use pushscribe::transcription::{Transcriber, TranscriptionError, TranscriptionRequest};
use pushscribe::utils::logging::init_logging;

/// 不调用远端服务，只把录音落盘
struct SaveToDisk;

#[async_trait]
impl Transcriber for SaveToDisk {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<String, TranscriptionError> {
        let artifact = request.artifact;
        let path = tokio::task::spawn_blocking(move || artifact.save_to_temp_file())
            .await
            .map_err(|e| TranscriptionError::Other(e.to_string()))?
            .map_err(|e| TranscriptionError::AudioMissing(e.to_string()))?;
        Ok(path.display().to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    println!("=== 按住说话演示 ===\n");
    println!("可用输入设备:");
    for device in list_input_devices()? {
        println!(
            "  {} (default: {}, native 16kHz: {})",
            device.name, device.is_default, device.supports_capture_rate
        );
    }
    println!(
        "\n按住 {} 录音，松开结束，{} 取消，Ctrl+C 退出\n",
        config.hotkey.combination, config.hotkey.cancel
    );

    let source = CpalSource::new(config.recording.input_device.as_deref());
    let (controller, mut events) = DictationController::new(
        config,
        Collaborators {
            source: Box::new(source),
            timer: Arc::new(TokioTimer::new(tokio::runtime::Handle::current())),
            transcriber: Arc::new(SaveToDisk),
            output: Arc::new(|text: &str| -> anyhow::Result<()> {
                println!("-> {}", text);
                Ok(())
            }),
        },
        tokio::runtime::Handle::current(),
    )?;

    controller.start(Box::new(RdevListener::new(true)))?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(DictationEvent::Transcribed { text }) => println!("已保存: {}", text),
                Some(event) => println!("{:?}", event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.stop();
    println!("\n最近的录音:");
    for text in controller.recent_transcriptions() {
        println!("  {}", text);
    }
    Ok(())
}

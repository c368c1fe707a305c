//! 录音产物

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::audio::{encode_wav, write_wav, AudioFormat, AudioResult};

/// 临时 WAV 文件名前缀
pub const TEMP_FILE_PREFIX: &str = "pushscribe_";

/// 一次成功录音的最终结果
///
/// 每次成功的 `end` 只产生一个，创建后不再修改；会话不保留任何引用。
#[derive(Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    duration: Duration,
    frame_count: usize,
    sample_count: u64,
    format: AudioFormat,
    pcm: Vec<u8>,
}

impl CaptureArtifact {
    pub(crate) fn new(format: AudioFormat, frame_count: usize, sample_count: u64, pcm: Vec<u8>) -> Self {
        Self {
            duration: format.duration_of(sample_count),
            frame_count,
            sample_count,
            format,
            pcm,
        }
    }

    /// 总时长（总采样数 / 采样率）
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// 帧数
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// 采样数
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// 采集格式
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// 单声道 16 位小端 PCM
    pub fn pcm(&self) -> &[u8] {
        &self.pcm
    }

    /// 取出 PCM 数据
    pub fn into_pcm(self) -> Vec<u8> {
        self.pcm
    }

    /// 编码为内存中的 WAV
    pub fn to_wav_bytes(&self) -> AudioResult<Vec<u8>> {
        encode_wav(self.format, &self.pcm)
    }

    /// 写入 WAV 文件
    pub fn write_wav(&self, path: impl AsRef<Path>) -> AudioResult<()> {
        let file = File::create(path.as_ref())?;
        write_wav(BufWriter::new(file), self.format, &self.pcm)?;
        debug!(path = %path.as_ref().display(), "Capture written");
        Ok(())
    }

    /// 写入系统临时目录下的 WAV 文件并返回路径
    ///
    /// 文件不会自动删除，由调用方负责清理。
    pub fn save_to_temp_file(&self) -> AudioResult<PathBuf> {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(".wav")
            .tempfile()?;
        let (file, path) = temp.keep().map_err(|e| e.error)?;
        write_wav(BufWriter::new(file), self.format, &self.pcm)?;
        debug!(path = %path.display(), "Capture saved to temp file");
        Ok(path)
    }
}

impl std::fmt::Debug for CaptureArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureArtifact")
            .field("duration", &self.duration)
            .field("frame_count", &self.frame_count)
            .field("sample_count", &self.sample_count)
            .field("format", &self.format)
            .field("pcm_bytes", &self.pcm.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;

    fn artifact(samples: usize) -> CaptureArtifact {
        let frame = AudioFrame::silence(samples);
        CaptureArtifact::new(
            AudioFormat::default(),
            1,
            samples as u64,
            frame.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_duration_from_samples() {
        let a = artifact(12_800);
        assert_eq!(a.duration(), Duration::from_millis(800));
        assert_eq!(a.pcm().len(), 25_600);
    }

    #[test]
    fn test_save_to_temp_file() {
        let a = artifact(1600);
        let path = a.save_to_temp_file().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(TEMP_FILE_PREFIX));
        assert!(name.ends_with(".wav"));

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 1600);
        std::fs::remove_file(path).unwrap();
    }
}

use serde::Serialize;

use crate::session::StopReason;

/// 发送给宿主程序（托盘、通知）的事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum DictationEvent {
    /// 开始录音
    RecordingStarted,
    /// 录音结束
    RecordingStopped { reason: StopReason },
    /// 录音被取消
    RecordingCancelled,
    /// 录音过短，已丢弃
    TooShort,
    /// 麦克风不可用
    DeviceUnavailable { message: String },
    /// 转写完成
    Transcribed { text: String },
    /// 转写失败
    TranscriptionFailed { message: String },
    /// 文本输出失败
    OutputFailed { message: String },
}

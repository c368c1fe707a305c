use std::sync::{Arc, Mutex, PoisonError};

/// 转写文本的去处（剪贴板、粘贴、终端……）
pub trait TextOutput: Send + Sync {
    fn output(&self, text: &str) -> anyhow::Result<()>;
}

impl<F> TextOutput for F
where
    F: Fn(&str) -> anyhow::Result<()> + Send + Sync,
{
    fn output(&self, text: &str) -> anyhow::Result<()> {
        self(text)
    }
}

/// 把文本收集到内存中
///
/// 克隆出的句柄共享同一份记录。
#[derive(Clone, Default)]
pub struct MemoryOutput {
    texts: Arc<Mutex<Vec<String>>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已输出的全部文本
    pub fn texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TextOutput for MemoryOutput {
    fn output(&self, text: &str) -> anyhow::Result<()> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        Ok(())
    }
}

// src/save/src/lib.rs

use anyhow::{Context, anyhow};
use bincode::{Decode, Encode, config};
use error::{GamificationError, GamificationResult};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    cell::RefCell,
    fs,
    io::Write,
    path::{Path, PathBuf},
    rc::Rc,
};

/// 当前存档格式版本
pub const SAVE_VERSION: u32 = 1;

fn legacy_version() -> u32 {
    1 // 没有版本字段的旧存档按版本1处理
}

/// 存档文件格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// 自描述格式，缺失字段读取为默认值（向前兼容）
    #[default]
    Json,
    /// 紧凑的二进制格式，要求字段布局一致
    Binary,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Json => "json",
            SaveFormat::Binary => "sav",
        }
    }
}

/// 持久化接口：引擎只通过它读写进度
pub trait ProgressStore<T> {
    /// 读取存档；没有存档时返回 `Ok(None)`
    fn load(&mut self) -> GamificationResult<Option<T>>;

    /// 写入存档
    fn save(&mut self, state: &T) -> GamificationResult<()>;

    /// 把读不出来的存档移到一边，避免下一次写入覆盖它
    fn set_aside(&mut self) -> GamificationResult<()> {
        Ok(())
    }
}

impl<T, S: ProgressStore<T> + ?Sized> ProgressStore<T> for Box<S> {
    fn load(&mut self) -> GamificationResult<Option<T>> {
        (**self).load()
    }

    fn save(&mut self, state: &T) -> GamificationResult<()> {
        (**self).save(state)
    }

    fn set_aside(&mut self) -> GamificationResult<()> {
        (**self).set_aside()
    }
}

/// JSON存档外层结构
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    #[serde(default = "legacy_version")]
    version: u32,
    progress: T,
}

/// 文件存档系统
#[derive(Debug, Clone)]
pub struct FileStore {
    save_dir: PathBuf,
    name: String,
    format: SaveFormat,
}

impl FileStore {
    /// 初始化存档系统
    pub fn new(save_dir: impl AsRef<Path>, format: SaveFormat) -> GamificationResult<Self> {
        Self::with_name(save_dir, "progress", format)
    }

    pub fn with_name(
        save_dir: impl AsRef<Path>,
        name: impl Into<String>,
        format: SaveFormat,
    ) -> GamificationResult<Self> {
        let save_dir = save_dir.as_ref();

        // 创建存档目录(如果不存在)
        if !save_dir.exists() {
            fs::create_dir_all(save_dir).context("Failed to create save directory")?;
        }

        Ok(Self {
            save_dir: save_dir.to_path_buf(),
            name: name.into(),
            format,
        })
    }

    /// 获取存档文件路径
    pub fn path(&self) -> PathBuf {
        self.save_dir
            .join(format!("{}.{}", self.name, self.format.extension()))
    }

    /// 获取存档目录路径
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    /// 检查是否已有存档
    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// 无法读取的存档被移到这里(例如 `progress.json.bak`)
    pub fn backup_path(&self) -> PathBuf {
        self.save_dir.join(format!(
            "{}.{}.bak",
            self.name,
            self.format.extension()
        ))
    }

    fn encode<T>(&self, state: &T) -> GamificationResult<Vec<u8>>
    where
        T: Serialize + Encode,
    {
        match self.format {
            SaveFormat::Json => {
                let envelope = Envelope {
                    version: SAVE_VERSION,
                    progress: state,
                };
                Ok(serde_json::to_vec_pretty(&envelope)?)
            }
            SaveFormat::Binary => {
                let cfg = config::standard();
                let mut bytes = bincode::encode_to_vec(SAVE_VERSION, cfg)?;
                bytes.extend(bincode::encode_to_vec(state, cfg)?);
                Ok(bytes)
            }
        }
    }

    fn decode<T>(&self, bytes: &[u8]) -> GamificationResult<T>
    where
        T: DeserializeOwned + Decode<()>,
    {
        match self.format {
            SaveFormat::Json => {
                let envelope: Envelope<T> = serde_json::from_slice(bytes)?;
                Ok(envelope.progress)
            }
            SaveFormat::Binary => {
                let cfg = config::standard();
                let (version, read): (u32, usize) = bincode::decode_from_slice(bytes, cfg)?;
                if version > SAVE_VERSION {
                    return Err(GamificationError::VersionMismatch(version));
                }
                let (state, _) = bincode::decode_from_slice(&bytes[read..], cfg)?;
                Ok(state)
            }
        }
    }
}

impl<T> ProgressStore<T> for FileStore
where
    T: Serialize + DeserializeOwned + Encode + Decode<()>,
{
    fn load(&mut self) -> GamificationResult<Option<T>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).with_context(|| format!("Failed to read save file: {:?}", path))?;
        self.decode(&bytes).map(Some)
    }

    fn save(&mut self, state: &T) -> GamificationResult<()> {
        let path = self.path();
        let bytes = self.encode(state)?;

        // 先写临时文件
        let temp_path = path.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary save file")?;
        file.write_all(&bytes)
            .context("Failed to write save data")?;

        // 确保数据写入磁盘
        file.flush().context("Failed to flush save data")?;

        // 原子性重命名
        fs::rename(&temp_path, &path).context("Failed to commit save file")?;

        Ok(())
    }

    fn set_aside(&mut self) -> GamificationResult<()> {
        let path = self.path();
        if !path.exists() {
            return Ok(());
        }
        let backup = self.backup_path();
        fs::rename(&path, &backup)
            .with_context(|| format!("Failed to move unreadable save to {:?}", backup))?;
        Ok(())
    }
}

#[derive(Debug)]
struct MemorySlot<T> {
    state: Option<T>,
    available: bool,
    saves: usize,
}

/// 内存存档，克隆出的句柄共享同一份数据
#[derive(Debug)]
pub struct MemoryStore<T> {
    slot: Rc<RefCell<MemorySlot<T>>>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(MemorySlot {
                state: None,
                available: true,
                saves: 0,
            })),
        }
    }

    /// 以已有存档初始化
    pub fn with_state(state: T) -> Self {
        let store = Self::new();
        store.slot.borrow_mut().state = Some(state);
        store
    }

    /// 模拟存储后端不可用：之后的读写都会失败
    pub fn set_available(&self, available: bool) {
        self.slot.borrow_mut().available = available;
    }

    /// 成功写入的次数
    pub fn save_count(&self) -> usize {
        self.slot.borrow().saves
    }
}

impl<T: Clone> MemoryStore<T> {
    pub fn snapshot(&self) -> Option<T> {
        self.slot.borrow().state.clone()
    }
}

impl<T: Clone> ProgressStore<T> for MemoryStore<T> {
    fn load(&mut self) -> GamificationResult<Option<T>> {
        let slot = self.slot.borrow();
        if !slot.available {
            return Err(GamificationError::Persistence(anyhow!(
                "memory store is unavailable"
            )));
        }
        Ok(slot.state.clone())
    }

    fn save(&mut self, state: &T) -> GamificationResult<()> {
        let mut slot = self.slot.borrow_mut();
        if !slot.available {
            return Err(GamificationError::Persistence(anyhow!(
                "memory store is unavailable"
            )));
        }
        slot.state = Some(state.clone());
        slot.saves += 1;
        Ok(())
    }
}

//! 설정 모듈
//!
//! `settings.json` 파일, 환경 변수, CLI 플래그 순서로 값을 덮어씁니다.
//! 파일이 없거나 읽을 수 없으면 기본값을 씁니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::note::DEFAULT_TEMPLATE;

/// 설정 디렉토리 이름
const APP_DIR: &str = "booknote";

/// 설정 파일 이름
const SETTINGS_FILE: &str = "settings.json";

/// 볼트 경로 환경 변수
pub const ENV_VAULT: &str = "BOOKNOTE_VAULT";
/// 노트 폴더 환경 변수
pub const ENV_FOLDER: &str = "BOOKNOTE_FOLDER";
/// User-Agent 환경 변수
pub const ENV_USER_AGENT: &str = "BOOKNOTE_USER_AGENT";

/// 설정 디렉토리 경로 반환
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

// ============================================================================
// Settings
// ============================================================================

/// 사용자 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 노트 볼트 루트
    pub vault_dir: PathBuf,
    /// 볼트 안에서 노트를 만들 폴더
    pub folder: String,
    /// 사용자 템플릿 파일 (없으면 기본 템플릿)
    pub template_file: Option<PathBuf>,
    /// 요청에 쓸 User-Agent (비어 있으면 기본값)
    pub user_agent: String,
    /// 외부 카탈로그 요약 조회 여부
    pub fetch_summary: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: dirs::document_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Vault"),
            folder: "Books".to_string(),
            template_file: None,
            user_agent: String::new(),
            fetch_summary: true,
        }
    }
}

impl Settings {
    /// 기본 설정 파일 경로
    pub fn default_path() -> PathBuf {
        get_config_dir().join(SETTINGS_FILE)
    }

    /// 기본 경로에서 로드하고 환경 변수 적용
    pub fn load() -> Self {
        let mut settings = Self::load_from(&Self::default_path());
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// 파일에서 로드
    ///
    /// 파일이 없으면 기본값, 파싱에 실패하면 경고를 남기고 기본값을 씁니다.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("설정 파일 없음, 기본값 사용: {}", path.display());
            return Self::default();
        }

        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("설정 파일을 읽지 못해 기본값 사용: {:#}", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("설정 파일 읽기 실패: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("설정 파일 파싱 실패: {}", path.display()))
    }

    /// 파일에 저장 (상위 디렉토리 생성)
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("설정 디렉토리 생성 실패: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("설정 직렬화 실패")?;
        std::fs::write(path, json)
            .with_context(|| format!("설정 파일 쓰기 실패: {}", path.display()))
    }

    /// 환경 변수 덮어쓰기
    ///
    /// 빈 값은 무시합니다.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(vault) = get(ENV_VAULT) {
            self.vault_dir = PathBuf::from(vault);
        }
        if let Some(folder) = get(ENV_FOLDER) {
            self.folder = folder;
        }
        if let Some(user_agent) = get(ENV_USER_AGENT) {
            self.user_agent = user_agent;
        }
    }

    /// 노트 템플릿 (사용자 파일 또는 기본 템플릿)
    pub fn template(&self) -> Result<String> {
        match &self.template_file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("템플릿 파일 읽기 실패: {}", path.display())),
            None => Ok(DEFAULT_TEMPLATE.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.folder, "Books");
        assert!(settings.fetch_summary);
        assert!(settings.template_file.is_none());
        assert!(settings.user_agent.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings {
            vault_dir: PathBuf::from("/notes"),
            folder: "Reading".to_string(),
            template_file: Some(PathBuf::from("/notes/book.md")),
            user_agent: "custom/1.0".to_string(),
            fetch_summary: false,
        };
        settings.save_to(&path).expect("save");

        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_and_broken_files_fall_back() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("missing.json");
        assert_eq!(Settings::load_from(&missing), Settings::default());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").expect("write");
        assert_eq!(Settings::load_from(&broken), Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"folder": "Library"}"#).expect("write");

        let settings = Settings::load_from(&path);
        assert_eq!(settings.folder, "Library");
        assert!(settings.fetch_summary);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides(|key| match key {
            ENV_VAULT => Some("/vault".to_string()),
            ENV_FOLDER => Some("  ".to_string()),
            ENV_USER_AGENT => Some("agent/2".to_string()),
            _ => None,
        });

        assert_eq!(settings.vault_dir, PathBuf::from("/vault"));
        assert_eq!(settings.folder, "Books");
        assert_eq!(settings.user_agent, "agent/2");
    }

    #[test]
    fn test_template_source() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("book.md");
        std::fs::write(&path, "# {{title}}").expect("write");

        let mut settings = Settings::default();
        assert_eq!(settings.template().expect("default"), DEFAULT_TEMPLATE);

        settings.template_file = Some(path);
        assert_eq!(settings.template().expect("custom"), "# {{title}}");

        settings.template_file = Some(dir.path().join("missing.md"));
        assert!(settings.template().is_err());
    }
}

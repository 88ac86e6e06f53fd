//! Home page settings and the keyed settings store.
//!
//! Settings are JSON documents stored under a key in the `settings` table.
//! Every successful save is mirrored to the [`LocalCache`]; loading falls back
//! to that copy when the database read fails, and to defaults after that.

use crate::{
    core::local_cache::LocalCache,
    entities::{Setting, SettingColumn, setting},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{info, warn};

/// Settings key of the home page document
pub const HOME_PAGE_KEY: &str = "homePage";

/// Reads and decodes the document stored under `key`.
pub async fn load_setting<T: DeserializeOwned>(
    db: &DatabaseConnection,
    key: &str,
) -> Result<Option<T>> {
    match Setting::find_by_id(key.to_string()).one(db).await? {
        Some(model) => Ok(Some(serde_json::from_value(model.value)?)),
        None => Ok(None),
    }
}

/// Stores `value` under `key`, replacing any previous document.
pub async fn save_setting<T: Serialize>(db: &DatabaseConnection, key: &str, value: &T) -> Result<()> {
    let model = setting::ActiveModel {
        key: Set(key.to_string()),
        value: Set(serde_json::to_value(value)?),
        updated_at: Set(chrono::Utc::now()),
    };
    Setting::insert(model)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(SettingColumn::Key)
                .update_columns([SettingColumn::Value, SettingColumn::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Links shown in the home page footer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    /// Instagram profile URL
    pub instagram: Option<String>,
    /// Facebook page URL
    pub facebook: Option<String>,
    /// YouTube channel URL
    pub youtube: Option<String>,
    /// Institutional site URL
    pub website: Option<String>,
}

/// Public home page content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HomePageSettings {
    /// Name shown in the header
    pub app_name: String,
    /// Hero title
    pub title: String,
    /// Hero subtitle
    pub subtitle: String,
    /// Intro paragraph
    pub description: String,
    /// Footer line
    pub footer_text: String,
    /// Logo image, if any
    pub logo_url: Option<String>,
    /// Footer links
    pub social_links: SocialLinks,
    /// `#rrggbb`
    pub primary_color: String,
}

impl Default for HomePageSettings {
    fn default() -> Self {
        Self {
            app_name: "Censo Escolar".to_string(),
            title: "Censo Escolar".to_string(),
            subtitle: "Levantamento de dados das unidades educacionais".to_string(),
            description: String::new(),
            footer_text: String::new(),
            logo_url: None,
            social_links: SocialLinks::default(),
            primary_color: "#1976d2".to_string(),
        }
    }
}

impl HomePageSettings {
    /// Checks the fields that the page cannot render without.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(Error::validation("appName must not be empty"));
        }
        let color = self.primary_color.as_bytes();
        let is_hex = color.len() == 7
            && color[0] == b'#'
            && color[1..].iter().all(u8::is_ascii_hexdigit);
        if !is_hex {
            return Err(Error::validation(format!(
                "primaryColor must look like #rrggbb, got {}",
                self.primary_color
            )));
        }
        Ok(())
    }
}

/// Loads the home page settings, never failing.
pub async fn load_home_page(db: &DatabaseConnection, cache: &LocalCache) -> HomePageSettings {
    match load_setting::<HomePageSettings>(db, HOME_PAGE_KEY).await {
        Ok(Some(settings)) => return settings,
        Ok(None) => return HomePageSettings::default(),
        Err(e) => warn!("Could not load home page settings, trying local copy: {}", e),
    }

    match cache.read::<HomePageSettings>(HOME_PAGE_KEY) {
        Ok(Some(settings)) => settings,
        Ok(None) => HomePageSettings::default(),
        Err(e) => {
            warn!("Local home page settings unreadable, using defaults: {}", e);
            HomePageSettings::default()
        }
    }
}

/// Validates and stores the home page settings, then refreshes the local copy.
pub async fn save_home_page(
    db: &DatabaseConnection,
    cache: &LocalCache,
    settings: HomePageSettings,
) -> Result<HomePageSettings> {
    settings.validate()?;
    save_setting(db, HOME_PAGE_KEY, &settings).await?;
    if let Err(e) = cache.write(HOME_PAGE_KEY, &settings) {
        warn!("Saved home page settings but could not update the local copy: {}", e);
    }
    info!("Home page settings saved");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::local_cache::temp_cache;
    use crate::test_utils::setup_test_db;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_validation() {
        assert!(HomePageSettings::default().validate().is_ok());

        let mut settings = HomePageSettings::default();
        settings.primary_color = "blue".to_string();
        assert!(settings.validate().is_err());

        let mut settings = HomePageSettings::default();
        settings.app_name = " ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_camel_case_document() {
        let settings: HomePageSettings = serde_json::from_str(
            r##"{"appName":"Censo 2026","footerText":"SEMED","primaryColor":"#00aa00","socialLinks":{"instagram":"@semed"}}"##,
        )
        .unwrap();
        assert_eq!(settings.app_name, "Censo 2026");
        assert_eq!(settings.footer_text, "SEMED");
        assert_eq!(settings.social_links.instagram.as_deref(), Some("@semed"));
        assert_eq!(settings.title, "Censo Escolar");
    }

    #[tokio::test]
    async fn test_save_then_load() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = temp_cache("home-save");

        assert_eq!(load_home_page(&db, &cache).await, HomePageSettings::default());

        let mut settings = HomePageSettings::default();
        settings.title = "Censo das Escolas".to_string();
        save_home_page(&db, &cache, settings.clone()).await?;
        assert_eq!(load_home_page(&db, &cache).await, settings);

        // Saving again replaces the document
        settings.subtitle = "Edição 2026".to_string();
        save_home_page(&db, &cache, settings.clone()).await?;
        assert_eq!(load_home_page(&db, &cache).await, settings);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_falls_back_to_local_copy() {
        let cache = temp_cache("home-fallback");
        let mut settings = HomePageSettings::default();
        settings.title = "Cópia local".to_string();
        cache.write(HOME_PAGE_KEY, &settings).unwrap();

        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_errors([DbErr::Custom("offline".to_string())])
            .into_connection();
        assert_eq!(load_home_page(&db, &cache).await, settings);
    }
}

#[cfg(test)]
pub mod test_db {
    use std::collections::HashMap;
    use std::sync::Once;

    use chrono::{NaiveDate, NaiveTime};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};

    use crate::db::{create_tournament, create_user, run_migrations};
    use crate::error::AppError;
    use crate::models::NewTournament;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    pub fn sample_tournament(store: &str, location: &str, date: &str, game: &str) -> NewTournament {
        NewTournament {
            store_name: store.to_string(),
            location: location.to_string(),
            time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            prize: Some("Booster Box".to_string()),
            game: game.to_string(),
            category: "Master".to_string(),
            format: "League Cup".to_string(),
            image: None,
        }
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<(String, String)>,
        tournaments: Vec<NewTournament>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn admin(self, username: &str) -> Self {
            self.user_with_password(username, STANDARD_PASSWORD)
        }

        pub fn user_with_password(mut self, username: &str, password: &str) -> Self {
            self.users.push((username.to_string(), password.to_string()));
            self
        }

        pub fn tournament(mut self, tournament: NewTournament) -> Self {
            self.tournaments.push(tournament);
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .parse_filters("debug")
                    .is_test(true)
                    .try_init();
            });

            // Every connection to `sqlite::memory:` is its own database, so
            // the pool is pinned to a single connection that never recycles.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?;

            run_migrations(&pool).await?;

            let mut user_id_map = HashMap::new();
            for (username, password) in &self.users {
                let id = create_user(&pool, username, password).await?;
                user_id_map.insert(username.clone(), id);
            }

            let mut tournament_ids = Vec::with_capacity(self.tournaments.len());
            for tournament in &self.tournaments {
                tournament_ids.push(create_tournament(&pool, tournament).await?.id);
            }

            Ok(TestDb {
                pool,
                user_id_map,
                tournament_ids,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub tournament_ids: Vec<i64>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use std::path::{Path, PathBuf};

    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use sqlx::{Pool, Sqlite};

    use super::test_db::{STANDARD_PASSWORD, TestDb, TestDbBuilder, sample_tournament};
    use crate::auth::LoginResponse;
    use crate::build_rocket;
    use crate::config::{AppContext, SiteConfig};
    use crate::uploads::UploadStore;

    pub const ADMIN_USERNAME: &str = "admin_user";
    const BOUNDARY: &str = "tcg-hub-test-boundary";

    /// Per-test upload directory, removed again when the test finishes.
    pub struct TestUploads {
        pub dir: PathBuf,
    }

    impl TestUploads {
        pub fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("tcg-hub-uploads-{}", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(&dir).expect("Failed to create upload dir");
            Self { dir }
        }

        pub fn files(&self) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(&self.dir)
                .expect("Failed to read upload dir")
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }

        pub fn contains(&self, filename: &str) -> bool {
            Path::new(&self.dir).join(filename).exists()
        }
    }

    impl Drop for TestUploads {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    pub fn test_config(upload_dir: &Path) -> SiteConfig {
        SiteConfig {
            upload_dir: upload_dir.to_path_buf(),
            seed_sample_data: false,
            ..SiteConfig::default()
        }
    }

    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .admin(ADMIN_USERNAME)
            .tournament(sample_tournament(
                "Card Shop Madrid",
                "Madrid",
                "2026-11-07",
                "Pokemon",
            ))
            .tournament(sample_tournament(
                "Trading Zone Valencia",
                "Valencia",
                "2026-11-14",
                "One Piece",
            ))
            .tournament(sample_tournament(
                "Dragon Shield Barcelona",
                "Barcelona",
                "2026-09-12",
                "Pokemon",
            ))
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, Pool<Sqlite>, TestUploads) {
        let uploads = TestUploads::new();
        let config = test_config(&uploads.dir);

        UploadStore::from_config(&config)
            .ensure_default_popup(&config.default_popup)
            .await
            .expect("Failed to write default popup");

        let pool = test_db.pool.clone();
        let rocket = build_rocket(AppContext::new(test_db.pool, config), rocket::Config::figment())
            .expect("Failed to build rocket");

        let client = Client::tracked(rocket)
            .await
            .expect("Failed to create test client");

        (client, pool, uploads)
    }

    /// Logs in through the login endpoint; the tracked client keeps the
    /// session cookie for subsequent requests.
    pub async fn login_test_user(client: &Client, username: &str, password: &str) {
        let response = client
            .post("/admin")
            .header(ContentType::JSON)
            .body(json!({ "username": username, "password": password }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok, "Login failed for {}", username);

        let body: LoginResponse = response.into_json().await.expect("Invalid login response");
        assert!(body.success);
    }

    pub async fn login_admin(client: &Client) {
        login_test_user(client, ADMIN_USERNAME, STANDARD_PASSWORD).await;
    }

    /// A single-file `multipart/form-data` body under the field name `file`.
    pub fn multipart_file(filename: &str, content: &[u8]) -> (ContentType, Vec<u8>) {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let content_type =
            ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY));

        (content_type, body)
    }
}

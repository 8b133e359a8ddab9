#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;

    use crate::assets::AssetResponse;
    use crate::db::{get_logo, get_popup, upsert_popup};
    use crate::test::test_utils::{
        TestUploads, create_standard_test_db, login_admin, multipart_file, setup_test_client,
    };
    use crate::validation::{ErrorResponse, MessageResponse};

    const DEFAULT_POPUP: &str = "popup_dummy.svg";
    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

    fn uploaded(uploads: &TestUploads) -> Vec<String> {
        uploads
            .files()
            .into_iter()
            .filter(|name| name != DEFAULT_POPUP)
            .collect()
    }

    async fn upload(client: &Client, path: &str, filename: &str) -> (Status, Option<AssetResponse>) {
        let (content_type, body) = multipart_file(filename, PNG_BYTES);
        let response = client
            .post(path.to_string())
            .header(content_type)
            .body(body)
            .dispatch()
            .await;

        let status = response.status();
        let asset = if status == Status::Created {
            response.into_json().await
        } else {
            None
        };
        (status, asset)
    }

    #[rocket::async_test]
    async fn test_logo_rejects_disallowed_extension() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let (content_type, body) = multipart_file("virus.exe", b"MZ");
        let response = client
            .post("/admin/logo")
            .header(content_type)
            .body(body)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        let error: ErrorResponse = response.into_json().await.unwrap();
        assert!(error.error.contains("png"), "{}", error.error);

        assert!(uploaded(&uploads).is_empty());
        assert!(get_logo(&pool).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn test_logo_rejects_empty_file() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let (content_type, body) = multipart_file("logo.png", b"");
        let response = client
            .post("/admin/logo")
            .header(content_type)
            .body(body)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        assert!(uploaded(&uploads).is_empty());
        assert!(get_logo(&pool).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn test_second_logo_replaces_first() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let (status, first) = upload(&client, "/admin/logo", "logo.png").await;
        assert_eq!(status, Status::Created);
        let first = first.unwrap();
        assert!(first.filename.starts_with("logo_"));
        assert!(first.filename.ends_with("_logo.png"));
        assert_eq!(first.url, format!("/uploads/{}", first.filename));
        assert!(uploads.contains(&first.filename));

        let (status, second) = upload(&client, "/admin/logo", "Nuevo Logo.PNG").await;
        assert_eq!(status, Status::Created);
        let second = second.unwrap();
        assert!(second.filename.ends_with("_Nuevo_Logo.png"));

        assert_eq!(uploaded(&uploads), vec![second.filename.clone()]);

        let row_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM logo")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row_count, 1);
        assert_eq!(get_logo(&pool).await.unwrap().unwrap().filename, second.filename);

        let info: AssetResponse = client
            .get("/admin/logo")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(info.filename, second.filename);
        assert_eq!(info.activo, None);
    }

    #[rocket::async_test]
    async fn test_uploaded_logo_is_served() {
        let (client, _, _uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let (_, logo) = upload(&client, "/admin/logo", "tienda.png").await;
        let logo = logo.unwrap();

        let response = client.get(logo.url.clone()).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_bytes().await.unwrap(), PNG_BYTES);

        let index = client.get("/").dispatch().await.into_string().await.unwrap();
        assert!(index.contains(&logo.filename));
    }

    #[rocket::async_test]
    async fn test_remove_logo() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let missing = client.delete("/admin/logo").dispatch().await;
        assert_eq!(missing.status(), Status::NotFound);
        let error: ErrorResponse = missing.into_json().await.unwrap();
        assert_eq!(error.error, "No hay logo configurado");

        let (_, logo) = upload(&client, "/admin/logo", "logo.webp").await;
        let logo = logo.unwrap();

        let response = client.delete("/admin/logo").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: MessageResponse = response.into_json().await.unwrap();
        assert_eq!(body.mensaje, "Logo eliminado exitosamente");

        assert!(!uploads.contains(&logo.filename));
        assert!(get_logo(&pool).await.unwrap().is_none());

        let info = client.get("/admin/logo").dispatch().await;
        assert_eq!(info.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_upload_over_limit_is_refused() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let oversized = vec![b'x'; 6 * 1024 * 1024];
        let (content_type, body) = multipart_file("grande.png", &oversized);
        let response = client
            .post("/admin/logo")
            .header(content_type)
            .body(body)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::PayloadTooLarge);
        let error: ErrorResponse = response.into_json().await.unwrap();
        assert!(error.error.contains("tamaño máximo"), "{}", error.error);

        assert!(uploaded(&uploads).is_empty());
        assert!(get_logo(&pool).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn test_popup_over_limit_is_refused() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let oversized = vec![b'x'; 6 * 1024 * 1024];
        let (content_type, body) = multipart_file("grande.jpg", &oversized);
        let response = client
            .post("/admin/popup")
            .header(content_type)
            .body(body)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::PayloadTooLarge);
        assert!(uploaded(&uploads).is_empty());
        assert!(get_popup(&pool).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn test_upload_without_file_field_is_bad_request() {
        let (client, pool, _uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let response = client
            .post("/admin/logo")
            .header(ContentType::Form)
            .body("otro=valor")
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        let error: ErrorResponse = response.into_json().await.unwrap();
        assert!(error.error.starts_with("Formulario inválido"), "{}", error.error);
        assert!(get_logo(&pool).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn test_popup_upload_and_toggle() {
        let (client, _, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let none = client.get("/admin/popup").dispatch().await;
        assert_eq!(none.status(), Status::NotFound);

        let toggle_missing = client.put("/admin/popup").dispatch().await;
        assert_eq!(toggle_missing.status(), Status::NotFound);
        let error: ErrorResponse = toggle_missing.into_json().await.unwrap();
        assert_eq!(error.error, "No hay popup configurado");

        let (status, popup) = upload(&client, "/admin/popup", "flyer.png").await;
        assert_eq!(status, Status::Created);
        let popup = popup.unwrap();
        assert_eq!(popup.activo, Some(true));
        assert!(uploads.contains(&popup.filename));

        let flipped: AssetResponse = client
            .put("/admin/popup")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(flipped.activo, Some(false));
        assert_eq!(flipped.filename, popup.filename);

        let explicit: AssetResponse = client
            .put("/admin/popup")
            .header(ContentType::JSON)
            .body(json!({ "activo": false }).to_string())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(explicit.activo, Some(false));

        let index = client.get("/").dispatch().await.into_string().await.unwrap();
        assert!(!index.contains(&popup.filename));

        let on: AssetResponse = client
            .put("/admin/popup")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(on.activo, Some(true));

        let index = client.get("/").dispatch().await.into_string().await.unwrap();
        assert!(index.contains(&popup.filename));
    }

    #[rocket::async_test]
    async fn test_popup_upload_keeps_active_flag() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let (_, first) = upload(&client, "/admin/popup", "uno.png").await;
        let first = first.unwrap();
        client
            .put("/admin/popup")
            .header(ContentType::JSON)
            .body(json!({ "activo": false }).to_string())
            .dispatch()
            .await;

        let (_, second) = upload(&client, "/admin/popup", "dos.png").await;
        let second = second.unwrap();

        assert_eq!(second.activo, Some(false));
        assert!(!uploads.contains(&first.filename));
        assert_eq!(uploaded(&uploads), vec![second.filename.clone()]);
        assert_eq!(get_popup(&pool).await.unwrap().unwrap().filename, second.filename);
    }

    #[rocket::async_test]
    async fn test_popup_reset_restores_default() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        let (_, popup) = upload(&client, "/admin/popup", "promo.jpg").await;
        let popup = popup.unwrap();
        assert_eq!(popup.activo, Some(true));

        let reset: AssetResponse = client
            .delete("/admin/popup")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();

        assert_eq!(reset.filename, DEFAULT_POPUP);
        assert_eq!(reset.activo, Some(false));
        assert!(!uploads.contains(&popup.filename));
        assert!(uploads.contains(DEFAULT_POPUP));

        let stored = get_popup(&pool).await.unwrap().unwrap();
        assert_eq!(stored.filename, DEFAULT_POPUP);
        assert!(!stored.active);

        // Replacing the default image must leave the bundled file alone.
        let (_, replacement) = upload(&client, "/admin/popup", "nuevo.png").await;
        assert!(replacement.is_some());
        assert!(uploads.contains(DEFAULT_POPUP));
    }

    #[rocket::async_test]
    async fn test_popup_reset_from_any_state() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;
        login_admin(&client).await;

        // No row at all.
        let response = client.delete("/admin/popup").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let stored = get_popup(&pool).await.unwrap().unwrap();
        assert_eq!(stored.filename, DEFAULT_POPUP);
        assert!(!stored.active);

        // Default image but active.
        upsert_popup(&pool, DEFAULT_POPUP, true).await.unwrap();
        let reset: AssetResponse = client
            .delete("/admin/popup")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(reset.filename, DEFAULT_POPUP);
        assert_eq!(reset.activo, Some(false));
        assert!(uploads.contains(DEFAULT_POPUP));
    }

    #[rocket::async_test]
    async fn test_asset_routes_require_authentication() {
        let (client, pool, uploads) = setup_test_client(create_standard_test_db().await).await;

        let (content_type, body) = multipart_file("logo.png", PNG_BYTES);
        let upload = client
            .post("/admin/logo")
            .header(content_type)
            .body(body)
            .dispatch()
            .await;
        assert_eq!(upload.status(), Status::Unauthorized);
        let error: ErrorResponse = upload.into_json().await.unwrap();
        assert_eq!(error.error, "Authentication required");

        for response in [
            client.get("/admin/logo").dispatch().await,
            client.delete("/admin/logo").dispatch().await,
            client.get("/admin/popup").dispatch().await,
            client.put("/admin/popup").dispatch().await,
            client.delete("/admin/popup").dispatch().await,
        ] {
            assert_eq!(response.status(), Status::Unauthorized);
            assert_eq!(response.content_type(), Some(ContentType::JSON));
        }

        assert!(uploaded(&uploads).is_empty());
        assert!(get_logo(&pool).await.unwrap().is_none());
        assert!(get_popup(&pool).await.unwrap().is_none());
    }
}

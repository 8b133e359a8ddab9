use rocket::State;
use rocket_dyn_templates::{Template, context};
use tracing::warn;

use crate::auth::User;
use crate::config::AppContext;
use crate::db::{get_logo, get_popup};

#[get("/")]
pub async fn index(ctx: &State<AppContext>) -> Template {
    // The listing itself loads through the API; a missing logo or popup
    // should never take the page down.
    let logo_url = match get_logo(&ctx.db).await {
        Ok(logo) => logo.map(|l| ctx.config.upload_url(&l.filename)),
        Err(e) => {
            warn!(error = ?e, "Failed to load logo for index page");
            None
        }
    };

    let popup_url = match get_popup(&ctx.db).await {
        Ok(popup) => popup
            .filter(|p| p.active)
            .map(|p| ctx.config.upload_url(&p.filename)),
        Err(e) => {
            warn!(error = ?e, "Failed to load popup for index page");
            None
        }
    };

    Template::render(
        "index",
        context! {
            title: &ctx.config.site_title,
            logo_url: logo_url,
            popup_url: popup_url,
        },
    )
}

#[get("/admin/panel")]
pub async fn admin_panel(user: User, ctx: &State<AppContext>) -> Template {
    let logo_url = get_logo(&ctx.db)
        .await
        .ok()
        .flatten()
        .map(|l| ctx.config.upload_url(&l.filename));

    Template::render(
        "admin_panel",
        context! {
            title: format!("Panel - {}", ctx.config.site_title),
            username: user.username,
            logo_url: logo_url,
        },
    )
}

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use envizion_core::{GalleryImage, ReferenceRecord, TeamMember};

pub const HOME_TITLE: &str = "ENVIZION - AI for Social Equity";
pub const CHATBOT_TITLE: &str = "AI Assistant - ENVIZION";
pub const GALLERY_TITLE: &str = "Gallery - ENVIZION";
pub const DONATION_TITLE: &str = "Donate - ENVIZION";
pub const PRESENTATION_TITLE: &str = "Presentation - ENVIZION";

#[derive(Template)]
#[template(path = "index.html")]
pub struct HomePage<'a> {
    pub title: &'a str,
    pub ngos: &'a [ReferenceRecord],
    pub team_members: &'a [TeamMember],
}

#[derive(Template)]
#[template(path = "chatbot.html")]
pub struct ChatbotPage<'a> {
    pub title: &'a str,
}

#[derive(Template)]
#[template(path = "gallery.html")]
pub struct GalleryPage<'a> {
    pub title: &'a str,
    pub gallery_images: &'a [GalleryImage],
}

#[derive(Template)]
#[template(path = "donation.html")]
pub struct DonationPage<'a> {
    pub title: &'a str,
    pub stripe_key: &'a str,
}

#[derive(Template)]
#[template(path = "presentation.html")]
pub struct PresentationPage<'a> {
    pub title: &'a str,
    pub app_url: &'a str,
}

pub fn render<T: Template>(page: &T) -> Response {
    match page.render() {
        Ok(body) => Html(body).into_response(),
        Err(error) => {
            tracing::error!(%error, "page render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "page unavailable").into_response()
        }
    }
}

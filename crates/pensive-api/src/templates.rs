use askama::Template;
use axum::response::Html;

use crate::error::AppError;
use crate::feed::PostView;

pub fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub title: &'static str,
    /// `@username` of whoever is browsing.
    pub name: String,
    pub display_form: bool,
    pub posts: Vec<PostView>,
}

#[derive(Template)]
#[template(path = "user/login.html")]
pub struct LoginTemplate {
    pub title: &'static str,
}

#[derive(Template)]
#[template(path = "user/register.html")]
pub struct RegisterTemplate {
    pub title: &'static str,
}

#[derive(Template)]
#[template(path = "user/settings.html")]
pub struct SettingsTemplate {
    pub title: &'static str,
    pub name: String,
}

#[derive(Template)]
#[template(path = "user/settings/profile.html")]
pub struct ProfileTemplate {
    pub title: &'static str,
    pub name: String,
    pub username: String,
}

#[derive(Template)]
#[template(path = "user/settings/privacy.html")]
pub struct PrivacyTemplate {
    pub title: &'static str,
    pub name: String,
}

#[derive(Template)]
#[template(path = "user/settings/account.html")]
pub struct AccountTemplate {
    pub title: &'static str,
    pub name: String,
    pub email: String,
    pub is_verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pensive_storage::MediaKind;

    #[test]
    fn home_escapes_post_bodies() {
        let page = HomeTemplate {
            title: "Posts",
            name: "@ada".into(),
            display_form: true,
            posts: vec![PostView {
                author: "grace".into(),
                body: "<script>alert(1)</script>".into(),
                attachment_url: String::new(),
                attachment_kind: MediaKind::None,
                updated_at: "01 Jan 24 10:00 +0000".into(),
            }],
        }
        .render()
        .unwrap();

        assert!(page.contains("@ada"));
        assert!(page.contains("@grace"));
        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("name=\"media-source\""));
    }

    #[test]
    fn media_kinds_pick_an_element() {
        let post = |kind| PostView {
            author: "ada".into(),
            body: String::new(),
            attachment_url: "http://localhost:8000/media/user1/x".into(),
            attachment_kind: kind,
            updated_at: String::new(),
        };
        let page = HomeTemplate {
            title: "Posts",
            name: "@ada".into(),
            display_form: false,
            posts: vec![post(MediaKind::Image), post(MediaKind::Video), post(MediaKind::Audio)],
        }
        .render()
        .unwrap();

        assert!(page.contains("<img"));
        assert!(page.contains("<video"));
        assert!(page.contains("<audio"));
        assert!(!page.contains("name=\"media-source\""));
    }

    #[test]
    fn account_page_shows_verification_state() {
        let unverified = AccountTemplate {
            title: "Account",
            name: "@ada".into(),
            email: "ada@example.com".into(),
            is_verified: false,
        }
        .render()
        .unwrap();
        assert!(unverified.contains("action=\"/verify\""));

        let verified = AccountTemplate {
            title: "Account",
            name: "@ada".into(),
            email: "ada@example.com".into(),
            is_verified: true,
        }
        .render()
        .unwrap();
        assert!(!verified.contains("action=\"/verify\""));
    }
}

use serde::Deserialize;

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

// -- Settings --

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    /// Current password, required to confirm the change.
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PrivacyForm {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub conf_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// -- Verification --

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub token: String,
}

/// One pool resource. `used` transitions false→true at most once; once true
/// the login corresponds to exactly one client's `steam_login`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AvailableLogin {
    pub login: String,
    pub used: bool,
}

//! API paths, relative to the configured base URL.

pub const LOGIN: &str = "/api/auth/login";
pub const REGISTER: &str = "/api/auth/register";
pub const VERIFY: &str = "/api/auth/verify";
pub const REFRESH: &str = "/api/auth/refresh";
pub const LOGOUT: &str = "/api/auth/logout";
pub const FORGOT_PASSWORD: &str = "/api/auth/forgot-password";
pub const RESET_PASSWORD: &str = "/api/auth/reset-password";
pub const CHANGE_PASSWORD: &str = "/api/auth/change-password";
pub const ME: &str = "/api/auth/me";

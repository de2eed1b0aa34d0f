pub mod cookies;
pub mod email;
pub mod external;
pub mod jwt;
pub mod maps;
pub mod oauth;
pub mod password;

pub mod bookmarks;
pub mod categories;
pub mod init;
pub mod maintenance;
pub mod misc;
pub mod password;

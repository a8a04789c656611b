/// Database row types. Records under the directory store are plain JSON and
/// have no row type; accounts belong to the identity provider.

pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

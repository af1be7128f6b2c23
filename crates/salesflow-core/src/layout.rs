pub const DEFAULT_BUCKET: &str = "datalake-utn";
pub const BRONZE_PREFIX: &str = "bronze/";
pub const SILVER_PREFIX: &str = "silver/";

/// Where raw inputs are read from and derived tables are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub bucket: String,
    pub bronze_prefix: String,
    pub silver_prefix: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            bronze_prefix: BRONZE_PREFIX.to_string(),
            silver_prefix: SILVER_PREFIX.to_string(),
        }
    }
}

impl StorageLayout {
    pub fn bronze_key(&self, file_name: &str) -> String {
        format!("{}{}", self.bronze_prefix, file_name)
    }

    pub fn silver_key(&self, file_name: &str) -> String {
        format!("{}{}", self.silver_prefix, file_name)
    }
}

use crate::{Comment, Error};

/// Pagination metadata attached to every listing
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub has_more: bool,

    /// Top-level listings call this `totalComments`, reply listings `total`
    #[serde(default, alias = "totalComments")]
    pub total: u64,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Page<T> {
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, has_more: bool, total: u64) -> Page<T> {
        Page {
            success: true,
            data,
            pagination: Pagination { has_more, total },
        }
    }

    pub fn into_result(self) -> Result<Page<T>, Error> {
        match self.success {
            true => Ok(self),
            false => Err(Error::Unsuccessful(String::from("listing was not successful"))),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Created {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Comment>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Created {
    pub fn into_result(self) -> Result<Comment, Error> {
        match (self.success, self.data) {
            (true, Some(c)) => Ok(c),
            (_, _) => Err(Error::Unsuccessful(
                self.message
                    .unwrap_or_else(|| String::from("comment was not created")),
            )),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl Ack {
    pub fn into_result(self) -> Result<(), Error> {
        match self.success {
            true => Ok(()),
            false => Err(Error::Unsuccessful(
                self.message
                    .unwrap_or_else(|| String::from("request was not successful")),
            )),
        }
    }
}

/// 1-based page cursor, sent as `?page=..&limit=..`
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> PageRequest {
        PageRequest { page, limit }
    }

    pub fn first(limit: u32) -> PageRequest {
        PageRequest::new(1, limit)
    }

    /// Number of items preceding this page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.limit as usize
    }
}

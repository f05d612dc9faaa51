use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginationInfo {
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
    /// 无限滚动用：下一页页码，没有更多时为 None
    pub next_page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

impl PaginationParams {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self { page, per_page }
    }

    pub fn get_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn get_per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    pub fn get_offset(&self) -> u64 {
        u64::from(self.get_page() - 1) * u64::from(self.get_per_page())
    }

    pub fn get_limit(&self) -> u32 {
        self.get_per_page()
    }
}

impl PaginationInfo {
    pub fn new(current_page: u32, per_page: u32, total: i64) -> Self {
        let total_pages = if total <= 0 {
            1
        } else {
            ((total as f64) / (per_page as f64)).ceil() as u32
        };
        let next_page = (current_page < total_pages).then_some(current_page + 1);

        Self {
            current_page,
            per_page,
            total,
            total_pages,
            next_page,
        }
    }
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, params: &PaginationParams, total: i64) -> Self {
        let pagination = PaginationInfo::new(params.get_page(), params.get_per_page(), total);

        Self { items, pagination }
    }

    /// 对本地缓存的完整列表做分页切片
    pub fn from_slice(all: &[T], params: &PaginationParams) -> Self
    where
        T: Clone,
    {
        let offset = usize::try_from(params.get_offset()).unwrap_or(usize::MAX);
        let items = all
            .iter()
            .skip(offset)
            .take(params.get_limit() as usize)
            .cloned()
            .collect();

        Self::new(items, params, all.len() as i64)
    }
}

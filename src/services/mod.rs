pub mod classify_service;
pub mod insight_service;
pub mod organize_service;
pub mod permission_service;
pub mod review_service;
pub mod scan_service;

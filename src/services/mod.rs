pub mod ipo_cache_service;
pub mod job_scheduler_service;
pub mod nav_cache_service;
pub mod scheduler_admin_service;
pub mod scheduler_config_service;
pub mod task_execution_service;

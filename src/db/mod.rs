pub mod scheduled_task_queries;

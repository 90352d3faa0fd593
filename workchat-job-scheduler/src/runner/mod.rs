use workchat_common::db::job_registry::Dao as JobRegistryDao;
use workchat_common::db::DbThreadPool;

use futures::future;
use std::time::{Duration, Instant, SystemTime};
use tokio::time;

use crate::jobs::Job;

struct JobContainer {
    job: Box<dyn Job>,
    run_frequency: Duration,
    last_run_time: SystemTime,
}

pub struct JobRunner {
    jobs: Vec<JobContainer>,
    update_frequency: Duration,
    db_thread_pool: DbThreadPool,
}

impl JobRunner {
    pub fn new(update_frequency: Duration, db_thread_pool: DbThreadPool) -> Self {
        Self {
            jobs: Vec::new(),
            update_frequency,
            db_thread_pool,
        }
    }

    /// A job that has never run is first run one `run_frequency` after registration.
    pub async fn register(&mut self, job: Box<dyn Job>, run_frequency: Duration) {
        let job_name = job.name();

        log::info!(
            "Registered job \"{}\" to run every {} seconds",
            job_name,
            run_frequency.as_secs()
        );

        let dao = JobRegistryDao::new(&self.db_thread_pool);
        let last_run_time = tokio::task::spawn_blocking(move || {
            dao.get_job_last_run_timestamp(job_name).unwrap_or_else(|e| {
                log::error!("Failed to get last run timestamp for job \"{job_name}\": {e}");
                None
            })
        })
        .await
        .unwrap_or_else(|e| {
            log::error!("Failed to join Tokio task: {e}");
            None
        });

        self.jobs.push(JobContainer {
            job,
            run_frequency,
            last_run_time: last_run_time.unwrap_or(SystemTime::now()),
        });
    }

    pub async fn start(&mut self) -> ! {
        loop {
            let before = Instant::now();

            self.run_due_jobs().await;

            let delta = before.elapsed();
            if delta < self.update_frequency {
                time::sleep(self.update_frequency - delta).await;
            }
        }
    }

    /// Runs every job whose period has elapsed and records its run in the registry.
    /// Returns the number of jobs that were started.
    pub async fn run_due_jobs(&mut self) -> usize {
        let now = SystemTime::now();

        let mut job_names = Vec::with_capacity(self.jobs.len());
        let mut job_futures = Vec::with_capacity(self.jobs.len());
        let mut record_run_futures = Vec::with_capacity(self.jobs.len());

        for job_container in &mut self.jobs {
            let time_since_last_run = now
                .duration_since(job_container.last_run_time)
                .unwrap_or(Duration::ZERO);

            if time_since_last_run < job_container.run_frequency || !job_container.job.is_ready()
            {
                continue;
            }

            job_container.last_run_time = now;

            let job_name = job_container.job.name();
            log::info!("Executing job \"{job_name}\"");

            let dao = JobRegistryDao::new(&self.db_thread_pool);
            record_run_futures.push(tokio::task::spawn_blocking(move || {
                dao.set_job_last_run_timestamp(job_name, now)
            }));

            job_names.push(job_name);
            job_futures.push(job_container.job.execute());
        }

        let (job_results, record_results) = future::join(
            future::join_all(job_futures),
            future::join_all(record_run_futures),
        )
        .await;

        for (job_name, result) in job_names.iter().zip(job_results) {
            match result {
                Ok(()) => log::info!("Job \"{job_name}\" finished successfully"),
                Err(e) => log::error!("Job \"{job_name}\" failed: {e}"),
            }
        }

        for result in record_results {
            match result {
                Ok(Ok(())) => (),
                Ok(Err(e)) => log::error!("Error recording job run: {e}"),
                Err(e) => log::error!("Failed to join Tokio task: {e}"),
            }
        }

        job_names.len()
    }
}

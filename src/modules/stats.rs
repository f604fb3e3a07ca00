use std::sync::Arc;
use std::sync::{
    atomic::{AtomicU32, AtomicU64, Ordering},
    Mutex,
};

use num_format::{Locale, ToFormattedString};
use poise::serenity_prelude::{self as serenity};
use sqlx::types::chrono;
use tokio::spawn;
use tokio_schedule::{every, Job};
use tracing::error;

use crate::types::{Context, Data, Error};

#[derive(Debug)]
pub(crate) struct Stats {
    pub(crate) num_cpus: usize,
    pub(crate) cpu_usage: AtomicU32,
    pub(crate) mem_usage: AtomicU64,
    pub(crate) started: chrono::DateTime<chrono::Utc>,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self {
            started: chrono::Utc::now(),
            num_cpus: num_cpus(),
            cpu_usage: AtomicU32::new(0),
            mem_usage: AtomicU64::new(0),
        }
    }

    pub(crate) fn set_cpu_usage(&self, cpu_usage: f32) {
        self.cpu_usage
            .store((cpu_usage * 100.) as u32, Ordering::SeqCst)
    }

    pub(crate) fn get_cpu_usage(&self) -> f32 {
        self.cpu_usage.load(Ordering::SeqCst) as f32 / 100. / self.num_cpus.max(1) as f32
    }

    pub(crate) fn set_mem_usage(&self, mem_usage: u64) {
        self.mem_usage.store(mem_usage, Ordering::SeqCst)
    }

    pub(crate) fn get_mem_usage(&self) -> u64 {
        self.mem_usage.load(Ordering::SeqCst)
    }
}

pub(crate) fn num_cpus() -> usize {
    let mut sys = sysinfo::System::new();
    sys.refresh_cpu_list(sysinfo::CpuRefreshKind::everything());
    sys.cpus().len()
}

fn update_stats(
    data: Arc<Data>,
    sys_mut: Arc<Mutex<sysinfo::System>>,
    pid: sysinfo::Pid,
) -> Result<(), Error> {
    let mut sys = sys_mut.lock().expect("update_stats mutex got poisoned");

    // NOTE: refreshing only our own PID reports 0% cpu usage
    sys.refresh_processes_specifics(
        sysinfo::ProcessesToUpdate::All,
        true,
        sysinfo::ProcessRefreshKind::new().with_cpu().with_memory(),
    );

    let proc = sys
        .process(pid)
        .ok_or("couldn't get stats for current process")?;

    data.stats.set_mem_usage(proc.memory());
    data.stats.set_cpu_usage(proc.cpu_usage());

    Ok(())
}

fn version() -> String {
    format!(
        "{} ({}{})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        match option_env!("VERGEN_GIT_DIRTY") {
            Some("true") => "-dirty",
            _ => "",
        },
    )
}

#[poise::command(slash_command)]
pub(crate) async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let time_before = chrono::Utc::now().timestamp_millis();
    let msg = ctx.reply("...").await?;
    let time_after = chrono::Utc::now().timestamp_millis();
    let api_latency = time_after - time_before;

    let data = ctx.data();
    let stats = &data.stats;
    let mem_usage_mb = stats.get_mem_usage() as f64 / 1024. / 1024.;
    let depth = data.scheduler.depth();
    let events = data.catalog.read().expect("catalog lock got poisoned").len();

    let embed = serenity::CreateEmbed::new()
        .title("Tierwatch")
        .field("Version", version(), true)
        .field("Servers", format!("{}", ctx.cache().guilds().len()), true)
        .field("Latency", format!("API: {} ms", api_latency), true)
        .field("CPU Usage", format!("{:.2} %", stats.get_cpu_usage()), true)
        .field("Memory Usage", format!("{:.02} MiB", mem_usage_mb), true)
        .field(
            "Game API",
            format!(
                "{} worker(s), queued: {} priority / {} normal\n{} ok, {} failed",
                data.scheduler.worker_count(),
                depth.priority,
                depth.normal,
                data.scheduler
                    .completed_count()
                    .to_formatted_string(&Locale::en),
                data.scheduler.failed_count().to_formatted_string(&Locale::en),
            ),
            false,
        )
        .field(
            "Tracking",
            format!("{} tier(s), {} known event(s)", data.tiers.len(), events),
            false,
        )
        .footer(serenity::CreateEmbedFooter::new("Tierwatch • Last Restarted:"))
        .timestamp(stats.started);

    let reply = poise::CreateReply::default().content("").embed(embed);

    msg.edit(ctx, reply).await?;
    Ok(())
}

pub(crate) fn commands() -> Vec<poise::Command<Arc<Data>, Error>> {
    vec![stats()]
}

pub(crate) fn start_tasks(data: Arc<Data>) {
    let sys = Arc::new(Mutex::new(sysinfo::System::new_all()));
    let pid = sysinfo::Pid::from_u32(std::process::id());

    spawn(every(5).seconds().perform(move || {
        let data = data.to_owned();
        let sys = sys.clone();

        async move {
            if let Err(err) = update_stats(data, sys, pid) {
                error!("error updating stats: {}", err);
            }
        }
    }));
}

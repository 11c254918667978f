// SPDX-License-Identifier: Apache-2.0

//! Admin dashboard aggregation over profile snapshots.

use crate::member::UserStatus;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const GROWTH_MONTHS: i32 = 6;
const WEEKLY_DAYS: i64 = 7;

/// The slice of a profile the dashboard needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub invited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub month: String,
    pub total: usize,
    pub invited: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRegistrations {
    pub day: String,
    pub registrations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_users: usize,
    pub active_rate: u32,
    pub monthly_new_users: usize,
    pub content_count: u64,
    pub growth: Vec<GrowthPoint>,
    pub weekly: Vec<DailyRegistrations>,
}

fn month_start(year: i32, month0: i32) -> Option<DateTime<Utc>> {
    let index = year * 12 + month0;
    let month = u32::try_from(index.rem_euclid(12) + 1).ok()?;
    Utc.with_ymd_and_hms(index.div_euclid(12), month, 1, 0, 0, 0)
        .single()
}

impl DashboardStats {
    #[must_use]
    pub fn compute(profiles: &[ProfileSnapshot], content_count: u64, now: DateTime<Utc>) -> Self {
        let total_users = profiles.len();
        let active = profiles
            .iter()
            .filter(|p| p.status == UserStatus::Active)
            .count();
        let active_rate = if total_users == 0 {
            0
        } else {
            (active as f64 / total_users as f64 * 100.0).round() as u32
        };

        let year = now.year();
        let month0 = now.month0() as i32;
        let this_month = month_start(year, month0).unwrap_or(now);
        let monthly_new_users = profiles
            .iter()
            .filter(|p| p.created_at >= this_month)
            .count();

        let mut growth = Vec::with_capacity(GROWTH_MONTHS as usize);
        for back in (0..GROWTH_MONTHS).rev() {
            let offset = month0 - back;
            let (Some(start), Some(end)) = (
                month_start(year, offset),
                month_start(year, offset + 1),
            ) else {
                continue;
            };
            let upto: Vec<&ProfileSnapshot> =
                profiles.iter().filter(|p| p.created_at < end).collect();
            growth.push(GrowthPoint {
                month: format!("{:04}-{:02}", start.year(), start.month()),
                total: upto.len(),
                invited: upto.iter().filter(|p| p.invited).count(),
            });
        }

        let today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or(now, |midnight| midnight.and_utc());
        let weekly = (0..WEEKLY_DAYS)
            .map(|i| {
                let start = today - Duration::days(WEEKLY_DAYS - 1 - i);
                let end = start + Duration::days(1);
                let day = if i == WEEKLY_DAYS - 1 {
                    "today".to_string()
                } else {
                    format!("{}/{} ({})", start.month(), start.day(), start.weekday())
                };
                DailyRegistrations {
                    day,
                    registrations: profiles
                        .iter()
                        .filter(|p| p.created_at >= start && p.created_at < end)
                        .count(),
                }
            })
            .collect();

        Self {
            total_users,
            active_rate,
            monthly_new_users,
            content_count,
            growth,
            weekly,
        }
    }
}

use super::super::domain::days_in_month;
use super::super::records::{Application, Interview, Referral};
use super::views::{
    CalendarDay, CalendarEvent, EventKind, EventMetadata, MonthGrid, Period, PeriodBuckets,
    TodayItems,
};
use chrono::{Datelike, Days, NaiveDate};

const UNKNOWN_COMPANY: &str = "Unknown Company";

/// Builds calendar events from scheduled interviews and referral follow-ups,
/// ordered by start time. Interviews without a time and referrals without a
/// follow-up date are skipped.
pub fn events_from(
    interviews: &[Interview],
    applications: &[Application],
    referrals: &[Referral],
) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = interviews
        .iter()
        .filter_map(|interview| {
            let starts_at = interview.scheduled_at?;
            let company = applications
                .iter()
                .find(|application| application.id == interview.application_id)
                .map_or(UNKNOWN_COMPANY, |application| {
                    application.company_name.as_str()
                });
            Some(CalendarEvent {
                id: format!("interview-{}", interview.id),
                title: format!("{company} - {}", interview.round_name),
                description: format!("Interview: {}", interview.round_name),
                starts_at,
                kind: EventKind::Interview,
                status: interview.status.label(),
                metadata: EventMetadata {
                    company: Some(company.to_string()),
                    round: Some(interview.round_name.clone()),
                    interview_id: Some(interview.id.clone()),
                    ..EventMetadata::default()
                },
            })
        })
        .collect();

    events.extend(referrals.iter().filter_map(|referral| {
        let starts_at = referral.follow_up_date?.and_hms_opt(0, 0, 0)?;
        Some(CalendarEvent {
            id: format!("referral-{}", referral.id),
            title: format!("Follow up with {}", referral.person_name),
            description: format!("Referral follow-up at {}", referral.company),
            starts_at,
            kind: EventKind::ReferralFollowUp,
            status: referral.status.label(),
            metadata: EventMetadata {
                company: Some(referral.company.clone()),
                person: Some(referral.person_name.clone()),
                referral_id: Some(referral.id.clone()),
                ..EventMetadata::default()
            },
        })
    }));

    events.sort_by_key(|event| event.starts_at);
    events
}

/// Places `day` relative to `today`. Weeks start on Sunday.
pub fn classify(day: NaiveDate, today: NaiveDate) -> Period {
    if day < today {
        return Period::Overdue;
    }
    if day == today {
        return Period::Today;
    }
    if today.succ_opt() == Some(day) {
        return Period::Tomorrow;
    }

    let into_week = u64::from(today.weekday().num_days_from_sunday());
    let week_end = today
        .checked_sub_days(Days::new(into_week))
        .and_then(|sunday| sunday.checked_add_days(Days::new(6)));
    match week_end {
        Some(saturday) if day <= saturday => Period::ThisWeek,
        _ => Period::Later,
    }
}

pub fn group_by_period(events: Vec<CalendarEvent>, today: NaiveDate) -> PeriodBuckets {
    let mut buckets = PeriodBuckets::default();
    for event in events {
        let slot = match classify(event.day(), today) {
            Period::Overdue => &mut buckets.overdue,
            Period::Today => &mut buckets.today,
            Period::Tomorrow => &mut buckets.tomorrow,
            Period::ThisWeek => &mut buckets.this_week,
            Period::Later => &mut buckets.later,
        };
        slot.push(event);
    }
    buckets
}

pub fn today_action_items(events: &[CalendarEvent], today: NaiveDate) -> TodayItems {
    let (interviews, follow_ups): (Vec<_>, Vec<_>) = events
        .iter()
        .filter(|event| event.day() == today)
        .cloned()
        .partition(|event| event.kind == EventKind::Interview);
    TodayItems {
        interviews,
        follow_ups,
    }
}

/// Lays out a month for display. `None` when the month does not exist.
pub fn month_grid(year: i32, month: u32, events: &[CalendarEvent]) -> Option<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = (1..=days_in_month(first))
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .map(|date| CalendarDay {
            date,
            events: events
                .iter()
                .filter(|event| event.day() == date)
                .cloned()
                .collect(),
        })
        .collect();

    Some(MonthGrid {
        year,
        month,
        label: first.format("%B %Y").to_string(),
        leading_blanks: first.weekday().num_days_from_sunday(),
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::domain::{
        ApplicationId, InterviewId, InterviewStatus, ReferralId, ReferralStatus, UserId,
    };
    use crate::tracker::records::NewApplication;
    use chrono::{NaiveDateTime, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn at(day: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        day.and_hms_opt(h, min, 0).expect("valid time")
    }

    fn event(id: &str, starts_at: NaiveDateTime, kind: EventKind) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            starts_at,
            kind,
            status: "Scheduled",
            metadata: EventMetadata::default(),
        }
    }

    fn interview(id: &str, application: &str, at: Option<NaiveDateTime>) -> Interview {
        Interview {
            id: InterviewId::from(id),
            user_id: UserId::from("user-1"),
            application_id: ApplicationId::from(application),
            round_name: "System Design".to_string(),
            scheduled_at: at,
            status: InterviewStatus::Scheduled,
            prep_notes: None,
            feedback: None,
            created_at: Utc::now(),
        }
    }

    fn referral(id: &str, follow_up: Option<NaiveDate>) -> Referral {
        Referral {
            id: ReferralId::from(id),
            user_id: UserId::from("user-1"),
            person_name: "Priya".to_string(),
            company: "Globex".to_string(),
            linkedin_url: None,
            relationship: None,
            date_asked: None,
            status: ReferralStatus::Pending,
            follow_up_date: follow_up,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn events_carry_titles_and_sort_by_time() {
        let application = NewApplication::new("Acme", "Engineer", date(2026, 10, 1)).into_record(
            ApplicationId::from("app-1"),
            UserId::from("user-1"),
            Utc::now(),
        );
        let interviews = vec![
            interview("int-1", "app-1", Some(at(date(2026, 10, 20), 15, 0))),
            interview("int-2", "app-missing", Some(at(date(2026, 10, 19), 9, 0))),
            interview("int-3", "app-1", None),
        ];
        let referrals = vec![
            referral("ref-1", Some(date(2026, 10, 19))),
            referral("ref-2", None),
        ];

        let events = events_from(&interviews, &[application], &referrals);
        let ids: Vec<_> = events.iter().map(|event| event.id.as_str()).collect();
        assert_eq!(ids, vec!["referral-ref-1", "interview-int-2", "interview-int-1"]);
        assert_eq!(events[0].title, "Follow up with Priya");
        assert_eq!(events[0].description, "Referral follow-up at Globex");
        assert_eq!(events[0].status, "Pending");
        assert_eq!(events[1].title, "Unknown Company - System Design");
        assert_eq!(events[2].title, "Acme - System Design");
        assert_eq!(events[2].description, "Interview: System Design");
    }

    #[test]
    fn equal_times_keep_interviews_first() {
        let midnight = at(date(2026, 10, 19), 0, 0);
        let events = events_from(
            &[interview("int-1", "app-1", Some(midnight))],
            &[],
            &[referral("ref-1", Some(date(2026, 10, 19)))],
        );
        assert_eq!(events[0].kind, EventKind::Interview);
        assert_eq!(events[1].kind, EventKind::ReferralFollowUp);
    }

    #[test]
    fn whole_of_today_lands_in_today() {
        let today = date(2026, 10, 14);
        let buckets = group_by_period(
            vec![
                event("early", at(today, 0, 0), EventKind::Interview),
                event("late", at(today, 23, 59), EventKind::Interview),
            ],
            today,
        );
        assert_eq!(buckets.today.len(), 2);
        assert_eq!(buckets.len(), 2);
    }

    #[test]
    fn classification_follows_sunday_weeks() {
        // Wednesday.
        let today = date(2026, 10, 14);
        assert_eq!(classify(date(2026, 10, 13), today), Period::Overdue);
        assert_eq!(classify(today, today), Period::Today);
        assert_eq!(classify(date(2026, 10, 15), today), Period::Tomorrow);
        assert_eq!(classify(date(2026, 10, 17), today), Period::ThisWeek);
        assert_eq!(classify(date(2026, 10, 18), today), Period::Later);

        // Saturday: tomorrow is the next week's Sunday.
        let saturday = date(2026, 10, 17);
        assert_eq!(classify(date(2026, 10, 18), saturday), Period::Tomorrow);
        assert_eq!(classify(date(2026, 10, 19), saturday), Period::Later);

        // Sunday: the rest of the week up to Saturday.
        let sunday = date(2026, 10, 18);
        assert_eq!(classify(date(2026, 10, 24), sunday), Period::ThisWeek);
        assert_eq!(classify(date(2026, 10, 25), sunday), Period::Later);
    }

    #[test]
    fn every_event_lands_in_exactly_one_bucket() {
        let today = date(2026, 10, 14);
        let start = date(2026, 9, 30);
        let events: Vec<_> = (0..40)
            .filter_map(|offset| start.checked_add_days(Days::new(offset)))
            .map(|day| event(&day.to_string(), at(day, 12, 0), EventKind::Interview))
            .collect();
        let total = events.len();

        let buckets = group_by_period(events, today);
        assert_eq!(buckets.len(), total);
        for period in [
            Period::Overdue,
            Period::Today,
            Period::Tomorrow,
            Period::ThisWeek,
            Period::Later,
        ] {
            assert!(buckets
                .bucket(period)
                .iter()
                .all(|event| classify(event.day(), today) == period));
        }
        assert_eq!(buckets.overdue.len(), 14);
        assert_eq!(buckets.this_week.len(), 2);
    }

    #[test]
    fn today_items_split_interviews_from_follow_ups() {
        let today = date(2026, 10, 18);
        let events = vec![
            event("a", at(today, 9, 0), EventKind::Interview),
            event("b", at(today, 0, 0), EventKind::ReferralFollowUp),
            event("c", at(date(2026, 10, 19), 9, 0), EventKind::Interview),
        ];
        let items = today_action_items(&events, today);
        assert_eq!(items.interviews.len(), 1);
        assert_eq!(items.follow_ups.len(), 1);
        assert_eq!(items.follow_ups[0].id, "b");
    }

    #[test]
    fn month_grid_pads_to_first_weekday() {
        // October 2026 starts on a Thursday.
        let events = vec![event("x", at(date(2026, 10, 18), 10, 0), EventKind::Interview)];
        let grid = month_grid(2026, 10, &events).expect("valid month");
        assert_eq!(grid.label, "October 2026");
        assert_eq!(grid.leading_blanks, 4);
        assert_eq!(grid.days.len(), 31);
        assert_eq!(grid.events_on(date(2026, 10, 18)).len(), 1);
        assert!(grid.events_on(date(2026, 10, 19)).is_empty());

        let weeks = grid.weeks();
        assert_eq!(weeks.len(), 5);
        assert!(weeks[0][..4].iter().all(Option::is_none));
        assert_eq!(weeks[0][4].map(|day| day.date), Some(date(2026, 10, 1)));
        assert!(weeks.iter().all(|row| row.len() == 7));

        // February 2026 starts on a Sunday.
        let february = month_grid(2026, 2, &[]).expect("valid month");
        assert_eq!(february.leading_blanks, 0);
        assert_eq!(february.days.len(), 28);
        assert!(month_grid(2026, 0, &[]).is_none());
    }
}

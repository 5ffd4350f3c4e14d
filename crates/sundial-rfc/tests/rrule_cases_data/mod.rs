use chrono::{NaiveDateTime, Utc};
use sundial_rfc::rfc::ical::core::DateTime;
use sundial_rfc::rfc::ical::expand::{RuleIter, TimeZoneResolver};
use sundial_rfc::rfc::ical::parse::{parse_datetime, parse_recurrence_pattern};

pub struct RRuleCase {
    pub name: &'static str,
    pub dtstart: &'static str,
    pub tzid: Option<&'static str>,
    pub rule: &'static str,
    pub expected: Option<&'static [&'static str]>,
    pub expected_len: Option<usize>,
    pub limit: u16,
    pub after: Option<&'static str>,
    pub before: Option<&'static str>,
    /// Also evaluated by the `rrule` crate and compared by instant.
    pub cross_check: bool,
}

#[expect(clippy::too_many_lines)]
pub fn rrule_cases() -> Vec<RRuleCase> {
    vec![
        RRuleCase {
            name: "daily_count",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=DAILY;COUNT=10",
            expected: Some(&[
                "19970902T090000Z",
                "19970903T090000Z",
                "19970904T090000Z",
                "19970905T090000Z",
                "19970906T090000Z",
                "19970907T090000Z",
                "19970908T090000Z",
                "19970909T090000Z",
                "19970910T090000Z",
                "19970911T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "daily_until",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=DAILY;UNTIL=19971224T000000Z",
            expected: None,
            expected_len: Some(113),
            limit: 200,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_other_day",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=DAILY;INTERVAL=2;COUNT=6",
            expected: Some(&[
                "19970902T090000Z",
                "19970904T090000Z",
                "19970906T090000Z",
                "19970908T090000Z",
                "19970910T090000Z",
                "19970912T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_ten_days",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=DAILY;INTERVAL=10;COUNT=5",
            expected: Some(&[
                "19970902T090000Z",
                "19970912T090000Z",
                "19970922T090000Z",
                "19971002T090000Z",
                "19971012T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_day_in_january",
            dtstart: "19980101T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;UNTIL=20000131T140000Z;BYMONTH=1;BYDAY=SU,MO,TU,WE,TH,FR,SA",
            expected: None,
            expected_len: Some(93),
            limit: 200,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "weekly_count",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=WEEKLY;COUNT=10",
            expected: Some(&[
                "19970902T090000Z",
                "19970909T090000Z",
                "19970916T090000Z",
                "19970923T090000Z",
                "19970930T090000Z",
                "19971007T090000Z",
                "19971014T090000Z",
                "19971021T090000Z",
                "19971028T090000Z",
                "19971104T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "weekly_until",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=WEEKLY;UNTIL=19971224T000000Z",
            expected: None,
            expected_len: Some(17),
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_other_week",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=WEEKLY;INTERVAL=2;WKST=SU;COUNT=6",
            expected: Some(&[
                "19970902T090000Z",
                "19970916T090000Z",
                "19970930T090000Z",
                "19971014T090000Z",
                "19971028T090000Z",
                "19971111T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "weekly_tue_thu_until",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=WEEKLY;UNTIL=19971007T000000Z;WKST=SU;BYDAY=TU,TH",
            expected: Some(&[
                "19970902T090000Z",
                "19970904T090000Z",
                "19970909T090000Z",
                "19970911T090000Z",
                "19970916T090000Z",
                "19970918T090000Z",
                "19970923T090000Z",
                "19970925T090000Z",
                "19970930T090000Z",
                "19971002T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_other_week_mwf",
            dtstart: "19970901T090000Z",
            tzid: None,
            rule: "FREQ=WEEKLY;INTERVAL=2;UNTIL=19971224T000000Z;WKST=SU;BYDAY=MO,WE,FR",
            expected: None,
            expected_len: Some(25),
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_other_week_tue_thu",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=WEEKLY;INTERVAL=2;COUNT=8;WKST=SU;BYDAY=TU,TH",
            expected: Some(&[
                "19970902T090000Z",
                "19970904T090000Z",
                "19970916T090000Z",
                "19970918T090000Z",
                "19970930T090000Z",
                "19971002T090000Z",
                "19971014T090000Z",
                "19971016T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "monthly_first_friday",
            dtstart: "19970905T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;COUNT=10;BYDAY=1FR",
            expected: Some(&[
                "19970905T090000Z",
                "19971003T090000Z",
                "19971107T090000Z",
                "19971205T090000Z",
                "19980102T090000Z",
                "19980206T090000Z",
                "19980306T090000Z",
                "19980403T090000Z",
                "19980501T090000Z",
                "19980605T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "monthly_first_friday_until",
            dtstart: "19970905T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;UNTIL=19971224T000000Z;BYDAY=1FR",
            expected: Some(&[
                "19970905T090000Z",
                "19971003T090000Z",
                "19971107T090000Z",
                "19971205T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "first_and_last_sunday",
            dtstart: "19970907T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;INTERVAL=2;COUNT=10;BYDAY=1SU,-1SU",
            expected: Some(&[
                "19970907T090000Z",
                "19970928T090000Z",
                "19971102T090000Z",
                "19971130T090000Z",
                "19980104T090000Z",
                "19980125T090000Z",
                "19980301T090000Z",
                "19980329T090000Z",
                "19980503T090000Z",
                "19980531T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "second_to_last_monday",
            dtstart: "19970922T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;COUNT=6;BYDAY=-2MO",
            expected: Some(&[
                "19970922T090000Z",
                "19971020T090000Z",
                "19971117T090000Z",
                "19971222T090000Z",
                "19980119T090000Z",
                "19980216T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "third_to_last_day",
            dtstart: "19970928T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;BYMONTHDAY=-3;COUNT=6",
            expected: Some(&[
                "19970928T090000Z",
                "19971029T090000Z",
                "19971128T090000Z",
                "19971229T090000Z",
                "19980129T090000Z",
                "19980226T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "second_and_fifteenth",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;COUNT=10;BYMONTHDAY=2,15",
            expected: Some(&[
                "19970902T090000Z",
                "19970915T090000Z",
                "19971002T090000Z",
                "19971015T090000Z",
                "19971102T090000Z",
                "19971115T090000Z",
                "19971202T090000Z",
                "19971215T090000Z",
                "19980102T090000Z",
                "19980115T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "first_and_last_day",
            dtstart: "19970930T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;COUNT=10;BYMONTHDAY=1,-1",
            expected: Some(&[
                "19970930T090000Z",
                "19971001T090000Z",
                "19971031T090000Z",
                "19971101T090000Z",
                "19971130T090000Z",
                "19971201T090000Z",
                "19971231T090000Z",
                "19980101T090000Z",
                "19980131T090000Z",
                "19980201T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_eighteen_months",
            dtstart: "19970910T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;INTERVAL=18;COUNT=10;BYMONTHDAY=10,11,12,13,14,15",
            expected: Some(&[
                "19970910T090000Z",
                "19970911T090000Z",
                "19970912T090000Z",
                "19970913T090000Z",
                "19970914T090000Z",
                "19970915T090000Z",
                "19990310T090000Z",
                "19990311T090000Z",
                "19990312T090000Z",
                "19990313T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_tuesday_other_month",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;INTERVAL=2;BYDAY=TU;COUNT=8",
            expected: Some(&[
                "19970902T090000Z",
                "19970909T090000Z",
                "19970916T090000Z",
                "19970923T090000Z",
                "19970930T090000Z",
                "19971104T090000Z",
                "19971111T090000Z",
                "19971118T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "june_and_july",
            dtstart: "19970610T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;COUNT=10;BYMONTH=6,7",
            expected: Some(&[
                "19970610T090000Z",
                "19970710T090000Z",
                "19980610T090000Z",
                "19980710T090000Z",
                "19990610T090000Z",
                "19990710T090000Z",
                "20000610T090000Z",
                "20000710T090000Z",
                "20010610T090000Z",
                "20010710T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "first_quarter_biennial",
            dtstart: "19970310T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;INTERVAL=2;COUNT=10;BYMONTH=1,2,3",
            expected: Some(&[
                "19970310T090000Z",
                "19990110T090000Z",
                "19990210T090000Z",
                "19990310T090000Z",
                "20010110T090000Z",
                "20010210T090000Z",
                "20010310T090000Z",
                "20030110T090000Z",
                "20030210T090000Z",
                "20030310T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "year_days",
            dtstart: "19970101T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;INTERVAL=3;COUNT=10;BYYEARDAY=1,100,200",
            expected: Some(&[
                "19970101T090000Z",
                "19970410T090000Z",
                "19970719T090000Z",
                "20000101T090000Z",
                "20000409T090000Z",
                "20000718T090000Z",
                "20030101T090000Z",
                "20030410T090000Z",
                "20030719T090000Z",
                "20060101T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "twentieth_monday",
            dtstart: "19970519T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;BYDAY=20MO;COUNT=3",
            expected: Some(&[
                "19970519T090000Z",
                "19980518T090000Z",
                "19990517T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "week_twenty_monday",
            dtstart: "19970512T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO;COUNT=3",
            expected: Some(&[
                "19970512T090000Z",
                "19980511T090000Z",
                "19990517T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "march_thursdays",
            dtstart: "19970313T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;BYMONTH=3;BYDAY=TH;COUNT=6",
            expected: Some(&[
                "19970313T090000Z",
                "19970320T090000Z",
                "19970327T090000Z",
                "19980305T090000Z",
                "19980312T090000Z",
                "19980319T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "summer_thursdays",
            dtstart: "19970605T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;BYDAY=TH;BYMONTH=6,7,8;COUNT=8",
            expected: Some(&[
                "19970605T090000Z",
                "19970612T090000Z",
                "19970619T090000Z",
                "19970626T090000Z",
                "19970703T090000Z",
                "19970710T090000Z",
                "19970717T090000Z",
                "19970724T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "friday_thirteenth",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;BYDAY=FR;BYMONTHDAY=13;COUNT=5",
            expected: Some(&[
                "19980213T090000Z",
                "19980313T090000Z",
                "19981113T090000Z",
                "19990813T090000Z",
                "20001013T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: false,
        },
        RRuleCase {
            name: "first_saturday_after_sunday",
            dtstart: "19970913T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;BYDAY=SA;BYMONTHDAY=7,8,9,10,11,12,13;COUNT=6",
            expected: Some(&[
                "19970913T090000Z",
                "19971011T090000Z",
                "19971108T090000Z",
                "19971213T090000Z",
                "19980110T090000Z",
                "19980207T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "election_day",
            dtstart: "19961105T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;INTERVAL=4;BYMONTH=11;BYDAY=TU;BYMONTHDAY=2,3,4,5,6,7,8;COUNT=3",
            expected: Some(&[
                "19961105T090000Z",
                "20001107T090000Z",
                "20041102T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "third_weekday_instance",
            dtstart: "19970904T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;COUNT=3;BYDAY=TU,WE,TH;BYSETPOS=3",
            expected: Some(&[
                "19970904T090000Z",
                "19971007T090000Z",
                "19971106T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "second_to_last_weekday",
            dtstart: "19970929T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-2;COUNT=5",
            expected: Some(&[
                "19970929T090000Z",
                "19971030T090000Z",
                "19971127T090000Z",
                "19971230T090000Z",
                "19980129T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_three_hours_until",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=HOURLY;INTERVAL=3;UNTIL=19970902T170000Z",
            expected: Some(&[
                "19970902T090000Z",
                "19970902T120000Z",
                "19970902T150000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_fifteen_minutes",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=MINUTELY;INTERVAL=15;COUNT=6",
            expected: Some(&[
                "19970902T090000Z",
                "19970902T091500Z",
                "19970902T093000Z",
                "19970902T094500Z",
                "19970902T100000Z",
                "19970902T101500Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_ninety_minutes",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=MINUTELY;INTERVAL=90;COUNT=4",
            expected: Some(&[
                "19970902T090000Z",
                "19970902T103000Z",
                "19970902T120000Z",
                "19970902T133000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "daily_time_grid",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=DAILY;BYHOUR=9,10,11,12,13,14,15,16;BYMINUTE=0,20,40;COUNT=10",
            expected: Some(&[
                "19970902T090000Z",
                "19970902T092000Z",
                "19970902T094000Z",
                "19970902T100000Z",
                "19970902T102000Z",
                "19970902T104000Z",
                "19970902T110000Z",
                "19970902T112000Z",
                "19970902T114000Z",
                "19970902T120000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "minutely_within_hours",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=MINUTELY;INTERVAL=20;BYHOUR=9,10,11,12,13,14,15,16;COUNT=10",
            expected: Some(&[
                "19970902T090000Z",
                "19970902T092000Z",
                "19970902T094000Z",
                "19970902T100000Z",
                "19970902T102000Z",
                "19970902T104000Z",
                "19970902T110000Z",
                "19970902T112000Z",
                "19970902T114000Z",
                "19970902T120000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "wkst_monday",
            dtstart: "19970805T090000Z",
            tzid: None,
            rule: "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=MO",
            expected: Some(&[
                "19970805T090000Z",
                "19970810T090000Z",
                "19970819T090000Z",
                "19970824T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "wkst_sunday",
            dtstart: "19970805T090000Z",
            tzid: None,
            rule: "FREQ=WEEKLY;INTERVAL=2;COUNT=4;BYDAY=TU,SU;WKST=SU",
            expected: Some(&[
                "19970805T090000Z",
                "19970817T090000Z",
                "19970819T090000Z",
                "19970831T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "skip_invalid_month_day",
            dtstart: "20070115T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;BYMONTHDAY=15,30;COUNT=5",
            expected: Some(&[
                "20070115T090000Z",
                "20070130T090000Z",
                "20070215T090000Z",
                "20070315T090000Z",
                "20070330T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "monthly_on_thirty_first",
            dtstart: "20260131T090000Z",
            tzid: None,
            rule: "FREQ=MONTHLY;COUNT=5",
            expected: Some(&[
                "20260131T090000Z",
                "20260331T090000Z",
                "20260531T090000Z",
                "20260731T090000Z",
                "20260831T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "leap_day_yearly",
            dtstart: "20240229T120000Z",
            tzid: None,
            rule: "FREQ=YEARLY;COUNT=3",
            expected: Some(&[
                "20240229T120000Z",
                "20280229T120000Z",
                "20320229T120000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "every_thirty_seconds",
            dtstart: "20260101T000000Z",
            tzid: None,
            rule: "FREQ=SECONDLY;INTERVAL=30;COUNT=4",
            expected: Some(&[
                "20260101T000000Z",
                "20260101T000030Z",
                "20260101T000100Z",
                "20260101T000130Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: true,
        },
        RRuleCase {
            name: "last_week_of_year",
            dtstart: "19970101T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;BYWEEKNO=-1;BYDAY=MO;COUNT=3",
            expected: Some(&[
                "19971222T090000Z",
                "19981228T090000Z",
                "19991227T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: false,
        },
        RRuleCase {
            name: "last_day_of_february",
            dtstart: "20230101T090000Z",
            tzid: None,
            rule: "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=-1;COUNT=3",
            expected: Some(&[
                "20230228T090000Z",
                "20240229T090000Z",
                "20250228T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: false,
        },
        RRuleCase {
            name: "new_york_daily_across_dst",
            dtstart: "20260306T090000",
            tzid: Some("America/New_York"),
            rule: "FREQ=DAILY;COUNT=4",
            expected: Some(&[
                "20260306T090000",
                "20260307T090000",
                "20260308T090000",
                "20260309T090000",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: false,
        },
        RRuleCase {
            name: "new_york_weekly_until_utc",
            dtstart: "20261020T180000",
            tzid: Some("America/New_York"),
            rule: "FREQ=WEEKLY;UNTIL=20261110T230000Z",
            expected: Some(&[
                "20261020T180000",
                "20261027T180000",
                "20261103T180000",
                "20261110T180000",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: false,
        },
        RRuleCase {
            name: "berlin_last_sunday",
            dtstart: "20260329T103000",
            tzid: Some("Europe/Berlin"),
            rule: "FREQ=MONTHLY;BYDAY=-1SU;COUNT=3",
            expected: Some(&[
                "20260329T103000",
                "20260426T103000",
                "20260531T103000",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: false,
        },
        RRuleCase {
            name: "floating_yearly",
            dtstart: "20260615T080000",
            tzid: None,
            rule: "FREQ=YEARLY;BYMONTH=6;BYDAY=3MO;COUNT=3",
            expected: Some(&[
                "20260615T080000",
                "20270621T080000",
                "20280619T080000",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
            cross_check: false,
        },
        RRuleCase {
            name: "daily_until_window",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=DAILY;UNTIL=19971224T000000Z",
            expected: Some(&[
                "19971201T090000Z",
                "19971202T090000Z",
                "19971203T090000Z",
                "19971204T090000Z",
                "19971205T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: Some("19971201T000000Z"),
            before: Some("19971205T090000Z"),
            cross_check: false,
        },
        RRuleCase {
            name: "count_counts_hidden_instances",
            dtstart: "19970902T090000Z",
            tzid: None,
            rule: "FREQ=WEEKLY;COUNT=10",
            expected: Some(&[
                "19971028T090000Z",
                "19971104T090000Z",
            ]),
            expected_len: None,
            limit: 100,
            after: Some("19971027T000000Z"),
            before: None,
            cross_check: false,
        },
    ]
}

fn evaluate(case: &RRuleCase, resolver: &TimeZoneResolver) -> Vec<DateTime> {
    let pattern = parse_recurrence_pattern(case.rule)
        .unwrap_or_else(|err| panic!("Failed to parse {}: {err}", case.name));
    let anchor = parse_datetime(case.dtstart, case.tzid)
        .unwrap_or_else(|err| panic!("Failed to parse anchor of {}: {err}", case.name));

    let mut iter = RuleIter::new(&pattern, &anchor, resolver)
        .unwrap_or_else(|err| panic!("Failed to start {}: {err}", case.name));
    if let Some(after) = case.after {
        iter = iter.resuming_from(parse_utc(after));
    }
    if let Some(before) = case.before {
        iter = iter.with_horizon(parse_utc(before));
    }

    iter.take(usize::from(case.limit))
        .map(|next| next.unwrap_or_else(|err| panic!("Case {} failed: {err}", case.name)))
        .collect()
}

pub fn assert_case(case: &RRuleCase) {
    let resolver = TimeZoneResolver::new();
    let actual: Vec<String> = evaluate(case, &resolver)
        .iter()
        .map(ToString::to_string)
        .collect();

    if let Some(expected) = case.expected {
        assert_eq!(actual, expected, "Case {} did not match", case.name);
    }

    if let Some(expected_len) = case.expected_len {
        assert_eq!(
            actual.len(),
            expected_len,
            "Case {} expected {} occurrences",
            case.name,
            expected_len
        );
    }

    let mut sorted = actual.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, actual, "Case {} is not strictly ascending", case.name);
}

pub fn cross_check_case(case: &RRuleCase) {
    let text = format!("DTSTART:{}\nRRULE:{}", case.dtstart, case.rule);
    let rrule_set: rrule::RRuleSet = text
        .parse()
        .unwrap_or_else(|err| panic!("rrule crate rejected {}: {err}", case.name));
    let theirs: Vec<i64> = rrule_set
        .all(case.limit)
        .dates
        .iter()
        .map(chrono::DateTime::timestamp)
        .collect();

    let resolver = TimeZoneResolver::new();
    let ours: Vec<i64> = evaluate(case, &resolver)
        .iter()
        .map(|value| {
            value
                .to_utc(&resolver)
                .unwrap_or_else(|err| panic!("Case {} has no instant: {err}", case.name))
                .timestamp()
        })
        .collect();

    assert_eq!(ours, theirs, "Case {} disagrees with the rrule crate", case.name);
}

fn parse_utc(value: &str) -> chrono::DateTime<Utc> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|err| panic!("Failed to parse UTC value {value}: {err}"))
}

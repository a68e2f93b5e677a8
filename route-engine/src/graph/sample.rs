//! A small built-in network of central Kampala.
//!
//! Useful for demos and tests when no dataset file is supplied. Travel
//! times are approximate matatu times in minutes; other modes are derived
//! from them.

use super::dataset::{EdgeRecord, GraphDataset};
use super::Schedule;
use crate::domain::Mode;

/// (id, name, lat, lon)
const LOCATIONS: [(u32, &str, f64, f64); 15] = [
    (0, "Old Taxi Park", 0.3146, 32.5761),
    (1, "Garden City", 0.3191, 32.5836),
    (2, "Nakasero Market", 0.3175, 32.5800),
    (3, "Kisekka Market", 0.3130, 32.5780),
    (4, "Owino Market", 0.3120, 32.5750),
    (5, "Wandegeya", 0.3270, 32.5690),
    (6, "Makerere University", 0.3381, 32.5696),
    (7, "Nakawa", 0.3250, 32.6100),
    (8, "Bugolobi", 0.3220, 32.6200),
    (9, "Kampala Road", 0.3170, 32.5820),
    (10, "Jinja Road", 0.3200, 32.5900),
    (11, "Entebbe Road", 0.3050, 32.5700),
    (12, "Bwaise", 0.3500, 32.5600),
    (13, "Lugogo", 0.3300, 32.6000),
    (14, "Kabalagala", 0.3100, 32.5900),
];

/// (from, to, matatu minutes, served by bus)
const ROADS: [(u32, u32, f64, bool); 15] = [
    (0, 1, 5.0, false),
    (0, 2, 3.0, false),
    (2, 1, 4.0, false),
    (0, 3, 2.0, false),
    (3, 4, 3.0, false),
    (2, 5, 8.0, true),
    (5, 6, 4.0, true),
    (1, 7, 10.0, true),
    (7, 8, 6.0, true),
    (1, 9, 2.0, false),
    (9, 10, 5.0, true),
    (10, 11, 8.0, true),
    (6, 12, 12.0, false),
    (7, 13, 4.0, false),
    (1, 14, 7.0, false),
];

/// Longest road, in matatu minutes, that is offered on foot.
const MAX_WALKABLE_MINS: f64 = 5.0;

/// Build the Kampala sample dataset.
///
/// Every road carries matatu and boda edges in both directions; short roads
/// are also walkable, and trunk roads have a bus every 15 minutes between
/// 06:00 and 22:00 (UTC). Fares are in Ugandan shillings.
pub fn kampala_network() -> GraphDataset {
    let mut dataset = LOCATIONS
        .iter()
        .fold(GraphDataset::new(), |ds, (id, name, lat, lon)| {
            ds.node(*id, name, *lat, *lon)
        });

    let bus_schedule = Schedule::Headway {
        first: 6 * 60,
        last: 22 * 60,
        every: 15,
    };

    let mut next_id = 0;
    for (from, to, mins, has_bus) in ROADS {
        let mut offers = vec![
            (Mode::Matatu, mins, 1000.0, None),
            (Mode::Boda, (mins * 0.6).max(1.0), 500.0 + 200.0 * mins, None),
        ];
        if mins <= MAX_WALKABLE_MINS {
            offers.push((Mode::Walk, mins * 4.0, 0.0, None));
        }
        if has_bus {
            offers.push((Mode::Bus, mins * 1.2, 700.0, Some(bus_schedule.clone())));
        }

        for (mode, duration, fare, schedule) in offers {
            for (a, b) in [(from, to), (to, from)] {
                let mut edge = EdgeRecord::new(next_id, a, b, mode, duration, fare);
                edge.schedule = schedule.clone();
                dataset = dataset.edge(edge);
                next_id += 1;
            }
        }
    }

    dataset
}

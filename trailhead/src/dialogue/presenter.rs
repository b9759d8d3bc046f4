// DialoguePresenter: every user-facing string of the conversation.
//
// Keeping the wording in one place lets the controller stay pure state
// machine and lets tests assert on messages without chasing format strings.

use itertools::Itertools;

use crate::capabilities::{describe_weather_code, NearbyPlace, WeatherReport};
use crate::catalog::{Difficulty, Trail};

use super::types::AmenityChoice;

pub struct DialoguePresenter;

impl DialoguePresenter {
    pub fn new() -> Self {
        Self
    }

    // -------------------------------------------------------------------------
    // Preference prompts
    // -------------------------------------------------------------------------

    /// Also the re-prompt after an unrecognized level: it lists all five.
    pub fn prompt_difficulty(&self) -> String {
        format!(
            "Choose a difficulty: {}.",
            Difficulty::ALL.iter().map(|level| level.title()).join(", ")
        )
    }

    pub fn prompt_max_distance(&self) -> &'static str {
        "What is your maximum distance in kilometers?"
    }

    pub fn reprompt_max_distance(&self) -> &'static str {
        "Please enter a number, e.g. 12."
    }

    pub fn prompt_scenery(&self) -> &'static str {
        "Any preferred scenery? (lake, forest, panoramic, ... - optional, just press enter to skip)"
    }

    pub fn prompt_route_type(&self) -> &'static str {
        "Preferred route type? (loop, out-and-back, ridge)"
    }

    // -------------------------------------------------------------------------
    // Recommendation and follow-ups
    // -------------------------------------------------------------------------

    pub fn no_trails_apology(&self) -> &'static str {
        "Sorry, I couldn't find any trails matching your preferences."
    }

    pub fn recommendation(&self, description: &str, reasoning: &str) -> String {
        format!(
            "{description}\n\nReason for selection: {reasoning}\n\n\
             Would you like the current weather for this trail?"
        )
    }

    /// Template used when the narrative collaborator is unavailable.
    pub fn fallback_description(&self, trail: &Trail) -> String {
        let tags = if trail.tags.is_empty() {
            String::new()
        } else {
            format!(", with tags: {}", trail.tags.join(", "))
        };
        format!(
            "{} is a {} trail, {} km long{}.",
            trail.name, trail.difficulty, trail.distance_km, tags
        )
    }

    pub fn weather_message(
        &self,
        trail: &Trail,
        report: &WeatherReport,
        narrative: Option<String>,
    ) -> String {
        let body = narrative.unwrap_or_else(|| self.fallback_weather(trail, report));
        format!(
            "{body}\n\nWould you like me to find cafes or pubs nearby for a post-hike refuel?"
        )
    }

    pub fn fallback_weather(&self, trail: &Trail, report: &WeatherReport) -> String {
        format!(
            "The weather at {} is {}, with a temperature of {:.1} C and winds at {:.1} km/h.",
            trail.name,
            describe_weather_code(report.weather_code),
            report.temperature_c,
            report.windspeed_kmh
        )
    }

    pub fn decline_selection(&self) -> &'static str {
        "Alright! Let me know if you want to plan a different trail."
    }

    // -------------------------------------------------------------------------
    // Amenities
    // -------------------------------------------------------------------------

    pub fn places_list(&self, places: &[NearbyPlace]) -> String {
        places
            .iter()
            .enumerate()
            .map(|(index, place)| {
                format!(
                    "{}. {} - {} km away - {}",
                    index + 1,
                    place.name,
                    place.distance_km,
                    place.description
                )
            })
            .join("\n")
    }

    pub fn places_message(&self, narrative: Option<String>, places: &[NearbyPlace]) -> String {
        narrative.unwrap_or_else(|| {
            format!("Here are some nearby places:\n{}", self.places_list(places))
        })
    }

    pub fn no_places_apology(&self, choice: AmenityChoice, radius_m: u32) -> String {
        format!(
            "Sorry, no nearby {} were found within {} km.",
            choice.label(),
            radius_m / 1000
        )
    }

    pub fn decline_amenities(&self) -> &'static str {
        "No problem, enjoy your hike!"
    }

    // -------------------------------------------------------------------------
    // Terminal state
    // -------------------------------------------------------------------------

    pub fn done_fallback(&self) -> &'static str {
        "I'm not sure how to respond to that. Start a new session to plan another trail."
    }
}

impl Default for DialoguePresenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_prompt_lists_all_levels() {
        let prompt = DialoguePresenter::new().prompt_difficulty();
        for level in Difficulty::ALL {
            assert!(prompt.contains(level.title()), "missing {}", level.title());
        }
    }

    #[test]
    fn test_places_list_is_numbered() {
        let places = vec![
            NearbyPlace {
                name: "The Old Dungeon Ghyll".to_string(),
                lat: 54.45,
                lon: -3.09,
                distance_km: 1.2,
                description: "amenity: pub".to_string(),
            },
            NearbyPlace {
                name: "Chesters by the River".to_string(),
                lat: 54.42,
                lon: -3.01,
                distance_km: 6.5,
                description: "amenity: cafe".to_string(),
            },
        ];
        let listing = DialoguePresenter::new().places_list(&places);
        assert!(listing.starts_with("1. The Old Dungeon Ghyll"));
        assert!(listing.contains("\n2. Chesters by the River"));
    }

    #[test]
    fn test_no_places_apology_names_the_category() {
        let presenter = DialoguePresenter::new();
        assert!(presenter
            .no_places_apology(AmenityChoice::Pubs, 20_000)
            .contains("pubs"));
        assert!(presenter
            .no_places_apology(AmenityChoice::Both, 20_000)
            .contains("within 20 km"));
    }
}

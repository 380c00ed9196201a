use lazy_static::lazy_static;

use super::Vibe;

struct Seed {
    name: &'static str,
    emoji: &'static str,
    description: &'static str,
    prompt: &'static str,
    color: &'static str,
    image: &'static str,
}

const SEEDS: [Seed; 8] = [
    Seed {
        name: "Cozy",
        emoji: "🧣",
        description: "Warm, comforting food that feels like a blanket",
        prompt: "cozy and comforting",
        color: "#E8A87C",
        image: "/images/vibes/cozy.jpg",
    },
    Seed {
        name: "Adventurous",
        emoji: "🌶️",
        description: "Bold flavors from somewhere you have never cooked before",
        prompt: "bold and adventurous with global flavors",
        color: "#D64545",
        image: "/images/vibes/adventurous.jpg",
    },
    Seed {
        name: "Fresh",
        emoji: "🥗",
        description: "Crisp, bright and full of greens",
        prompt: "light and fresh",
        color: "#7BC67B",
        image: "/images/vibes/fresh.jpg",
    },
    Seed {
        name: "Indulgent",
        emoji: "🍫",
        description: "Rich, decadent, no regrets",
        prompt: "rich and indulgent",
        color: "#8B5A2B",
        image: "/images/vibes/indulgent.jpg",
    },
    Seed {
        name: "Speedy",
        emoji: "⚡",
        description: "On the table in under thirty minutes",
        prompt: "quick and easy, ready in under 30 minutes",
        color: "#F2C94C",
        image: "/images/vibes/speedy.jpg",
    },
    Seed {
        name: "Healthy",
        emoji: "💪",
        description: "Nourishing and balanced",
        prompt: "healthy and nourishing",
        color: "#2D9CDB",
        image: "/images/vibes/healthy.jpg",
    },
    Seed {
        name: "Fancy",
        emoji: "✨",
        description: "Restaurant-worthy, made to impress",
        prompt: "elegant and impressive, restaurant-worthy",
        color: "#9B51E0",
        image: "/images/vibes/fancy.jpg",
    },
    Seed {
        name: "Nostalgic",
        emoji: "🏡",
        description: "Tastes like a classic family recipe",
        prompt: "nostalgic, like a classic family recipe",
        color: "#C97B63",
        image: "/images/vibes/nostalgic.jpg",
    },
];

lazy_static! {
    /// Fixed catalog, loaded once.
    pub static ref VIBES: Vec<Vibe> = SEEDS
        .iter()
        .map(|s| Vibe {
            name: s.name.to_string(),
            emoji: s.emoji.to_string(),
            description: s.description.to_string(),
            prompt: s.prompt.to_string(),
            color: s.color.to_string(),
            image: s.image.to_string(),
        })
        .collect();
}

pub fn find(name: &str) -> Option<&'static Vibe> {
    VIBES.iter().find(|v| v.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_unique() {
        let names: HashSet<_> = VIBES.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names.len(), VIBES.len());
        assert_eq!(VIBES.len(), 8);
    }

    #[test]
    fn find_is_case_insensitive() {
        assert_eq!(find("cozy").map(|v| v.emoji.as_str()), Some("🧣"));
        assert!(find("unknown").is_none());
    }
}

use crate::types::Language;

/// Localised certificate captions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub title: &'static str,
    pub awarded_to: &'static str,
    pub completion: &'static str,
    pub score: &'static str,
    pub date: &'static str,
    pub cert_id: &'static str,
    pub verify: &'static str,
}

const EN: Labels = Labels {
    title: "Certificate of Completion",
    awarded_to: "This certificate is proudly awarded to",
    completion: "for successfully completing the course",
    score: "Score",
    date: "Date",
    cert_id: "Certificate ID",
    verify: "Verify at",
};

const AM: Labels = Labels {
    title: "የማጠናቀቂያ የምስክር ወረቀት",
    awarded_to: "ይህ የምስክር ወረቀት የተሰጠው ለ",
    completion: "ኮርሱን በተሳካ ሁኔታ ስላጠናቀቁ",
    score: "ውጤት",
    date: "ቀን",
    cert_id: "የምስክር ወረቀት መለያ",
    verify: "ያረጋግጡ በ",
};

const OR: Labels = Labels {
    title: "Waraqaa Ragaa Xumuraa",
    awarded_to: "Waraqaan ragaa kun kan kennameef",
    completion: "koorsii kana milkaa'inaan xumuruu isaaniitiif",
    score: "Qabxii",
    date: "Guyyaa",
    cert_id: "Lakkoofsa Ragaa",
    verify: "Mirkaneessuuf",
};

impl Labels {
    pub fn for_language(language: Language) -> &'static Labels {
        match language {
            Language::Am => &AM,
            Language::Or => &OR,
            Language::En => &EN,
        }
    }

    /// Labels for a free-form code; unknown codes fall back to English
    pub fn for_code(code: &str) -> &'static Labels {
        code.parse().map(Self::for_language).unwrap_or(&EN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_fall_back_to_english() {
        assert_eq!(Labels::for_code("fr"), &EN);
        assert_eq!(Labels::for_code("OR").score, "Qabxii");
        assert_eq!(Labels::for_language(Language::Am).date, "ቀን");
    }
}

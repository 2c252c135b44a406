//! The fixed pool of drawable creatures.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;

/// Ultra-beast identities; these share one rarity allowance.
pub const ULTRA_BEASTS: &[&str] = &[
    "nihilego", "buzzwole", "pheromosa", "xurkitree", "celesteela",
    "kartana", "guzzlord", "naganadel", "stakataka", "blacephalon",
];

/// Final-stage creatures eligible for a draw, by API identity.
pub const FINAL_POOL: &[&str] = &[
    // Kanto
    "venusaur", "charizard", "blastoise", "butterfree", "beedrill", "pidgeot",
    "raticate", "fearow", "arbok", "raichu", "sandslash", "nidoqueen", "nidoking",
    "clefable", "ninetales", "wigglytuff", "vileplume", "parasect", "venomoth",
    "dugtrio", "persian", "golduck", "primeape", "arcanine", "poliwrath", "alakazam",
    "machamp", "victreebel", "tentacruel", "golem", "rapidash", "slowbro", "dodrio",
    "dewgong", "muk", "cloyster", "gengar", "hypno", "kingler", "electrode",
    "exeggutor", "marowak", "hitmonlee", "hitmonchan", "weezing", "kangaskhan",
    "seaking", "starmie", "pinsir", "tauros", "gyarados", "lapras", "ditto",
    "vaporeon", "jolteon", "flareon", "omastar", "kabutops", "aerodactyl", "snorlax",
    "articuno", "zapdos", "moltres", "dragonite", "mewtwo", "mew",
    // Johto
    "meganium", "typhlosion", "feraligatr", "furret", "noctowl", "ledian",
    "ariados", "crobat", "lanturn", "xatu", "ampharos", "bellossom", "azumarill",
    "sudowoodo", "politoed", "jumpluff", "sunflora", "quagsire", "espeon",
    "umbreon", "slowking", "unown", "wobbuffet", "girafarig", "forretress",
    "dunsparce", "steelix", "granbull", "qwilfish", "scizor", "shuckle",
    "heracross", "ursaring", "magcargo", "corsola", "octillery", "delibird",
    "skarmory", "houndoom", "kingdra", "donphan", "smeargle", "miltank",
    "blissey", "raikou", "entei", "suicune", "tyranitar", "lugia", "ho-oh",
    "celebi",
    // Hoenn
    "sceptile", "blaziken", "swampert", "mightyena", "linoone", "beautifly",
    "dustox", "ludicolo", "shiftry", "swellow", "pelipper", "gardevoir",
    "masquerain", "breloom", "slaking", "ninjask", "shedinja", "exploud",
    "hariyama", "delcatty", "sableye", "mawile", "aggron", "medicham",
    "manectric", "plusle", "minun", "volbeat", "illumise", "swalot", "sharpedo",
    "wailord", "camerupt", "torkoal", "grumpig", "spinda", "flygon", "cacturne",
    "altaria", "zangoose", "seviper", "lunatone", "solrock", "whiscash",
    "crawdaunt", "claydol", "cradily", "armaldo", "milotic", "kecleon",
    "banette", "tropius", "chimecho", "absol", "glalie", "walrein", "huntail",
    "gorebyss", "relicanth", "luvdisc", "salamence", "metagross", "regirock",
    "regice", "registeel", "latias", "latios", "kyogre", "groudon", "rayquaza",
    "jirachi",
    // Sinnoh
    "torterra", "infernape", "empoleon", "staraptor", "bibarel", "kricketune",
    "luxray", "roserade", "rampardos", "bastiodon", "vespiquen", "pachirisu",
    "floatzel", "cherrim", "gastrodon", "ambipom", "drifblim", "lopunny",
    "mismagius", "honchkrow", "purugly", "skuntank", "bronzong", "chatot",
    "spiritomb", "garchomp", "lucario", "hippowdon", "drapion", "toxicroak",
    "carnivine", "lumineon", "abomasnow", "weavile", "magnezone", "lickilicky",
    "rhyperior", "tangrowth", "electivire", "magmortar", "togekiss", "yanmega",
    "leafeon", "glaceon", "gliscor", "mamoswine", "porygon-z", "gallade",
    "probopass", "dusknoir", "froslass", "rotom", "uxie", "mesprit", "azelf",
    "dialga", "palkia", "heatran", "regigigas", "giratina-altered", "cresselia",
    "manaphy", "darkrai",
    // Unova
    "serperior", "emboar", "samurott", "watchog", "stoutland", "liepard",
    "simisage", "simisear", "simipour", "musharna", "unfezant", "zebstrika",
    "gigalith", "swoobat", "excadrill", "audino", "conkeldurr", "seismitoad",
    "throh", "sawk", "leavanny", "scolipede", "whimsicott", "lilligant",
    "krookodile", "crustle", "scrafty", "sigilyph", "cofagrigus", "carracosta",
    "archeops", "garbodor", "zoroark", "cinccino", "gothitelle", "reuniclus",
    "swanna", "vanilluxe", "escavalier", "amoonguss", "jellicent", "alomomola",
    "galvantula", "ferrothorn", "klinklang", "eelektross", "beheeyem",
    "chandelure", "haxorus", "beartic", "cryogonal", "accelgor", "stunfisk",
    "mienshao", "druddigon", "golurk", "bisharp", "braviary", "mandibuzz",
    "heatmor", "durant", "hydreigon", "volcarona", "cobalion", "terrakion",
    "virizion", "reshiram", "zekrom", "kyurem",
    // Kalos
    "chesnaught", "delphox", "greninja", "diggersby", "talonflame", "vivillon",
    "pyroar", "florges", "gogoat", "pangoro", "furfrou", "aromatisse", "slurpuff",
    "malamar", "barbaracle", "dragalge", "clawitzer", "heliolisk", "tyrantrum",
    "aurorus", "sylveon", "hawlucha", "dedenne", "carbink", "goodra", "klefki",
    "trevenant", "avalugg", "noivern", "xerneas", "yveltal", "diancie",
    "volcanion",
    // Alola
    "decidueye", "incineroar", "primarina", "toucannon", "gumshoos", "vikavolt",
    "crabominable", "ribombee", "araquanid", "lurantis", "shiinotic", "salazzle",
    "bewear", "tsareena", "comfey", "oranguru", "passimian", "golisopod",
    "palossand", "pyukumuku", "turtonator", "togedemaru", "bruxish", "drampa",
    "dhelmise", "kommo-o", "tapu-koko", "tapu-lele", "tapu-bulu", "tapu-fini",
    "solgaleo", "lunala", "nihilego", "buzzwole", "pheromosa", "xurkitree",
    "celesteela", "kartana", "guzzlord", "necrozma", "magearna", "marshadow",
    "naganadel", "stakataka", "blacephalon", "zeraora", "melmetal",
    // Galar
    "rillaboom", "cinderace", "inteleon", "greedent", "corviknight", "orbeetle",
    "thievul", "eldegoss", "dubwool", "drednaw", "boltund", "coalossal",
    "flapple", "appletun", "sandaconda", "cramorant", "barraskewda",
    "centiskorch", "grapploct", "polteageist", "hatterene", "grimmsnarl",
    "obstagoon", "perrserker", "sirfetchd", "runerigus", "alcremie", "falinks",
    "pincurchin", "frosmoth", "stonjourner", "copperajah", "dracozolt",
    "arctozolt", "dracovish", "arctovish", "duraludon", "dragapult", "zacian",
    "zamazenta", "eternatus", "regieleki", "regidrago", "glastrier", "spectrier",
    "calyrex",
];

/// Immutable list of drawable identities plus the ultra-beast set.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    names: Arc<[String]>,
    ultra_beasts: Arc<HashSet<String>>,
}

impl CandidatePool {
    /// Build a pool from arbitrary names; duplicates are removed, order is kept.
    pub fn new<I, S>(names: I, ultra_beasts: &[&str]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let names: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|name| seen.insert(name.clone()))
            .collect();

        Self {
            names: names.into(),
            ultra_beasts: Arc::new(ultra_beasts.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// The built-in pool.
    pub fn standard() -> Self {
        Self::new(FINAL_POOL.iter().copied(), ULTRA_BEASTS)
    }

    /// Uniformly random identity, `None` for an empty pool.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.names.choose(rng).map(String::as_str)
    }

    pub fn is_ultra_beast(&self, identity: &str) -> bool {
        self.ultra_beasts.contains(identity)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for CandidatePool {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_standard_pool_is_deduplicated() {
        let pool = CandidatePool::standard();
        let unique: HashSet<&String> = pool.names().iter().collect();
        assert_eq!(unique.len(), pool.len());
        assert_eq!(pool.len(), FINAL_POOL.len());

        let repeated = CandidatePool::new(["a", "b", "a"], &[]);
        assert_eq!(repeated.len(), 2);
    }

    #[test]
    fn test_every_ultra_beast_is_drawable() {
        let pool = CandidatePool::standard();
        for beast in ULTRA_BEASTS {
            assert!(pool.is_ultra_beast(beast));
            assert!(pool.names().iter().any(|n| n == beast));
        }
        assert!(!pool.is_ultra_beast("garchomp"));
    }

    #[test]
    fn test_pick() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = CandidatePool::new(["a", "b"], &[]);
        for _ in 0..20 {
            let name = pool.pick(&mut rng).unwrap();
            assert!(name == "a" || name == "b");
        }

        let empty = CandidatePool::new(Vec::<String>::new(), &[]);
        assert!(empty.pick(&mut rng).is_none());
    }
}

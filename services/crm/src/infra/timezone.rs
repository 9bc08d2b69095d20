use std::collections::HashMap;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::{Asia, Europe, Tz};

use crate::config::WorkingHours;
use crate::domain::repository::WorkingHoursResolver;

/// Customer city → IANA zone, for Russia and the CIS. Keys are lower case.
const CITY_ZONES: &[(&str, Tz)] = &[
    // Russia
    ("москва", Europe::Moscow),
    ("moscow", Europe::Moscow),
    ("санкт-петербург", Europe::Moscow),
    ("saint petersburg", Europe::Moscow),
    ("питер", Europe::Moscow),
    ("новосибирск", Asia::Novosibirsk),
    ("novosibirsk", Asia::Novosibirsk),
    ("екатеринбург", Asia::Yekaterinburg),
    ("yekaterinburg", Asia::Yekaterinburg),
    ("нижний новгород", Europe::Moscow),
    ("nizhny novgorod", Europe::Moscow),
    ("казань", Europe::Moscow),
    ("kazan", Europe::Moscow),
    ("челябинск", Asia::Yekaterinburg),
    ("chelyabinsk", Asia::Yekaterinburg),
    ("омск", Asia::Omsk),
    ("omsk", Asia::Omsk),
    ("самара", Europe::Samara),
    ("samara", Europe::Samara),
    ("ростов-на-дону", Europe::Moscow),
    ("rostov-on-don", Europe::Moscow),
    ("уфа", Asia::Yekaterinburg),
    ("ufa", Asia::Yekaterinburg),
    ("красноярск", Asia::Krasnoyarsk),
    ("krasnoyarsk", Asia::Krasnoyarsk),
    ("воронеж", Europe::Moscow),
    ("voronezh", Europe::Moscow),
    ("пермь", Asia::Yekaterinburg),
    ("perm", Asia::Yekaterinburg),
    ("волгоград", Europe::Volgograd),
    ("volgograd", Europe::Volgograd),
    ("краснодар", Europe::Moscow),
    ("krasnodar", Europe::Moscow),
    ("саратов", Europe::Saratov),
    ("saratov", Europe::Saratov),
    ("тюмень", Asia::Yekaterinburg),
    ("тольятти", Europe::Samara),
    ("ижевск", Europe::Samara),
    ("барнаул", Asia::Barnaul),
    ("ульяновск", Europe::Ulyanovsk),
    ("иркутск", Asia::Irkutsk),
    ("irkutsk", Asia::Irkutsk),
    ("хабаровск", Asia::Vladivostok),
    ("khabarovsk", Asia::Vladivostok),
    ("владивосток", Asia::Vladivostok),
    ("vladivostok", Asia::Vladivostok),
    ("ярославль", Europe::Moscow),
    ("махачкала", Europe::Moscow),
    ("томск", Asia::Tomsk),
    ("оренбург", Asia::Yekaterinburg),
    ("кемерово", Asia::Novokuznetsk),
    ("новокузнецк", Asia::Novokuznetsk),
    ("рязань", Europe::Moscow),
    ("астрахань", Europe::Astrakhan),
    ("пенза", Europe::Moscow),
    ("липецк", Europe::Moscow),
    ("тула", Europe::Moscow),
    ("киров", Europe::Kirov),
    ("чебоксары", Europe::Moscow),
    ("калининград", Europe::Kaliningrad),
    ("kaliningrad", Europe::Kaliningrad),
    ("брянск", Europe::Moscow),
    ("курск", Europe::Moscow),
    ("иваново", Europe::Moscow),
    ("магнитогорск", Asia::Yekaterinburg),
    ("тверь", Europe::Moscow),
    ("ставрополь", Europe::Moscow),
    ("симферополь", Europe::Simferopol),
    ("севастополь", Europe::Simferopol),
    ("сочи", Europe::Moscow),
    ("sochi", Europe::Moscow),
    // Ukraine
    ("киев", Europe::Kyiv),
    ("kyiv", Europe::Kyiv),
    ("харьков", Europe::Kyiv),
    ("одесса", Europe::Kyiv),
    ("днепр", Europe::Kyiv),
    ("львов", Europe::Kyiv),
    ("запорожье", Europe::Kyiv),
    ("кривой рог", Europe::Kyiv),
    ("николаев", Europe::Kyiv),
    ("мариуполь", Europe::Kyiv),
    ("луганск", Europe::Kyiv),
    ("винница", Europe::Kyiv),
    ("макеевка", Europe::Kyiv),
    ("херсон", Europe::Kyiv),
    ("полтава", Europe::Kyiv),
    ("чернигов", Europe::Kyiv),
    ("черкассы", Europe::Kyiv),
    ("житомир", Europe::Kyiv),
    ("сумы", Europe::Kyiv),
    ("хмельницкий", Europe::Kyiv),
    ("черновцы", Europe::Kyiv),
    ("горловка", Europe::Kyiv),
    ("ровно", Europe::Kyiv),
    ("каменское", Europe::Kyiv),
    ("кропивницкий", Europe::Kyiv),
    ("ивано-франковск", Europe::Kyiv),
    ("кременчуг", Europe::Kyiv),
    ("тернополь", Europe::Kyiv),
    ("белая церковь", Europe::Kyiv),
    ("краматорск", Europe::Kyiv),
    ("мелитополь", Europe::Kyiv),
    ("керчь", Europe::Simferopol),
    ("никополь", Europe::Kyiv),
    ("бердянск", Europe::Kyiv),
    ("славянск", Europe::Kyiv),
    ("ужгород", Europe::Kyiv),
    ("алчевск", Europe::Kyiv),
    ("павлоград", Europe::Kyiv),
    ("северодонецк", Europe::Kyiv),
    ("евпатория", Europe::Simferopol),
    ("лисичанск", Europe::Kyiv),
    ("каменец-подольский", Europe::Kyiv),
    // Belarus
    ("минск", Europe::Minsk),
    ("minsk", Europe::Minsk),
    ("гомель", Europe::Minsk),
    ("могилев", Europe::Minsk),
    ("витебск", Europe::Minsk),
    ("гродно", Europe::Minsk),
    ("брест", Europe::Minsk),
    ("бобруйск", Europe::Minsk),
    ("барановичи", Europe::Minsk),
    ("борисов", Europe::Minsk),
    ("пинск", Europe::Minsk),
    ("орша", Europe::Minsk),
    ("мозырь", Europe::Minsk),
    ("новополоцк", Europe::Minsk),
    ("лида", Europe::Minsk),
    ("молодечно", Europe::Minsk),
    ("полоцк", Europe::Minsk),
    ("солигорск", Europe::Minsk),
    ("слуцк", Europe::Minsk),
    ("жлобин", Europe::Minsk),
    ("светлогорск", Europe::Minsk),
    ("речица", Europe::Minsk),
    ("жодино", Europe::Minsk),
    ("слоним", Europe::Minsk),
    ("кобрин", Europe::Minsk),
    ("волковыск", Europe::Minsk),
    ("горки", Europe::Minsk),
    ("несвиж", Europe::Minsk),
    ("новогрудок", Europe::Minsk),
    ("ивье", Europe::Minsk),
    ("дзержинск", Europe::Minsk),
    ("марьина горка", Europe::Minsk),
    // Kazakhstan
    ("алматы", Asia::Almaty),
    ("almaty", Asia::Almaty),
    ("нур-султан", Asia::Almaty),
    ("астана", Asia::Almaty),
    ("astana", Asia::Almaty),
    ("шымкент", Asia::Almaty),
    ("актобе", Asia::Aqtobe),
    ("тараз", Asia::Almaty),
    ("павлодар", Asia::Almaty),
    ("усть-каменогорск", Asia::Almaty),
    ("семей", Asia::Almaty),
    ("атырау", Asia::Aqtau),
    ("костанай", Asia::Qostanay),
    ("кызылорда", Asia::Qyzylorda),
    ("уральск", Asia::Oral),
    ("петропавловск", Asia::Qostanay),
    ("актау", Asia::Aqtau),
    ("темиртау", Asia::Almaty),
    ("туркестан", Asia::Almaty),
    ("кокшетау", Asia::Qostanay),
    ("талдыкорган", Asia::Almaty),
    ("экибастуз", Asia::Almaty),
    ("рудный", Asia::Qostanay),
    ("жанаозен", Asia::Aqtau),
    ("балхаш", Asia::Almaty),
    ("сарань", Asia::Almaty),
    ("караганда", Asia::Almaty),
    ("степногорск", Asia::Qostanay),
    ("лисаковск", Asia::Qostanay),
    ("житикара", Asia::Qostanay),
    ("аркалык", Asia::Qostanay),
    ("капчагай", Asia::Almaty),
    ("текели", Asia::Almaty),
    ("жезказган", Asia::Qyzylorda),
    ("форт-шевченко", Asia::Aqtau),
    // Central Asia and the Caucasus
    ("ташкент", Asia::Tashkent),
    ("tashkent", Asia::Tashkent),
    ("самарканд", Asia::Samarkand),
    ("бишкек", Asia::Bishkek),
    ("bishkek", Asia::Bishkek),
    ("ош", Asia::Bishkek),
    ("душанбе", Asia::Dushanbe),
    ("худжанд", Asia::Dushanbe),
    ("ашхабад", Asia::Ashgabat),
    ("туркменабат", Asia::Ashgabat),
    ("баку", Asia::Baku),
    ("гянджа", Asia::Baku),
    ("ереван", Asia::Yerevan),
    ("гюмри", Asia::Yerevan),
    ("тбилиси", Asia::Tbilisi),
    ("батуми", Asia::Tbilisi),
    // Moldova
    ("кишинев", Europe::Chisinau),
    ("тирасполь", Europe::Chisinau),
];

/// Prefixes customers commonly type before the city name.
const CITY_PREFIXES: [&str; 4] = ["город ", "г. ", "г.", "г "];

/// Resolves a customer's local time from a static city table and checks it
/// against the configured business hours. Daylight saving follows the tz
/// database.
#[derive(Debug, Clone)]
pub struct CityTimezones {
    zones: HashMap<&'static str, Tz>,
    hours: WorkingHours,
}

impl CityTimezones {
    pub fn new(hours: WorkingHours) -> Self {
        Self {
            zones: CITY_ZONES.iter().copied().collect(),
            hours,
        }
    }

    pub fn zone(&self, city: &str) -> Option<Tz> {
        self.zones.get(normalize(city).as_str()).copied()
    }
}

fn normalize(city: &str) -> String {
    let lower = city.trim().to_lowercase().replace('ё', "е");
    let name = CITY_PREFIXES
        .iter()
        .find_map(|prefix| lower.strip_prefix(*prefix))
        .unwrap_or(&lower);
    name.trim().to_owned()
}

impl WorkingHoursResolver for CityTimezones {
    fn is_working_hours(&self, city: &str, at: DateTime<Utc>) -> Option<bool> {
        let zone = self.zone(city)?;
        let local_hour = at.with_timezone(&zone).hour();
        Some(self.hours.contains(local_hour))
    }
}

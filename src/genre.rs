use serde::{Serialize, Serializer};

// Genres the quiz can land on. Declaration order doubles as the tie-break
// order when two genres score the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Genre {
    Drama,
    Romance,
    Comedy,
    Action,
    SciFi,
    Fantasy,
}

impl Genre {
    pub const ALL: [Genre; 6] = [
        Genre::Drama,
        Genre::Romance,
        Genre::Comedy,
        Genre::Action,
        Genre::SciFi,
        Genre::Fantasy,
    ];

    pub fn tmdb_id(self) -> u32 {
        match self {
            Genre::Drama => 18,
            Genre::Romance => 10749,
            Genre::Comedy => 35,
            Genre::Action => 28,
            Genre::SciFi => 878,
            Genre::Fantasy => 14,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Genre::Drama => "드라마",
            Genre::Romance => "로맨스",
            Genre::Comedy => "코미디",
            Genre::Action => "액션",
            Genre::SciFi => "SF",
            Genre::Fantasy => "판타지",
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            Genre::Drama => "사람의 감정과 이야기에 깊이 공감하는 당신에게는 여운이 남는 드라마가 잘 어울려요.",
            Genre::Romance => "따뜻한 관계와 설렘을 소중히 여기는 당신에게는 로맨스 영화가 딱이에요.",
            Genre::Comedy => "웃음과 즐거움을 몰고 다니는 당신에게는 유쾌한 코미디가 최고예요.",
            Genre::Action => "에너지 넘치고 몸으로 부딪히는 걸 좋아하는 당신에게는 시원한 액션이 어울려요.",
            Genre::SciFi => "호기심이 많고 새로운 아이디어를 즐기는 당신에게는 상상력 가득한 SF가 어울려요.",
            Genre::Fantasy => "새로운 세계를 꿈꾸는 모험가인 당신에게는 판타지 영화가 잘 맞아요.",
        }
    }

    pub fn from_tmdb_id(id: u32) -> Option<Genre> {
        Genre::ALL.into_iter().find(|g| g.tmdb_id() == id)
    }
}

impl Serialize for Genre {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

use std::collections::BTreeSet;

use packet_core::assembly::difficulty::Jitter;
use packet_core::model::category::{Category, CategoryMap};
use packet_core::model::question::{Question, QuestionId, QuestionType};
use packet_core::model::record::QuestionRecord;
use packet_core::model::round::{Round, RoundKind};
use packet_core::snapshot::PacketSnapshot;
use packet_core::{AssemblyConfig, PacketAssembler, PacketError, PacketSet, SchemaError, Strategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct PoolBuilder {
    next_id: usize,
    rng: StdRng,
    questions: Vec<Question>,
}

impl PoolBuilder {
    fn new(seed: u64) -> Self {
        Self {
            next_id: 1,
            rng: StdRng::seed_from_u64(seed),
            questions: Vec::new(),
        }
    }

    fn add(&mut self, category: Category, kind: QuestionType, quality: f64) -> QuestionId {
        let id = QuestionId(self.next_id);
        self.next_id += 1;
        let difficulty = self.rng.gen_range(1.0..5.0);
        let mut question = Question::new(id, category, kind)
            .with_text(format!("q{}", id.0), format!("a{}", id.0))
            .with_ratings(difficulty, quality);
        if category.requires_subcategory() {
            question = question.with_subcategory("Nuclear");
        }
        self.questions.push(question);
        id
    }

    /// `count` toss-ups and `count` bonuses with random quality in [2, 5).
    fn add_pairs(&mut self, category: Category, count: usize) {
        for _ in 0..count {
            for kind in QuestionType::BOTH {
                let quality = self.rng.gen_range(2.0..5.0);
                self.add(category, kind, quality);
            }
        }
    }

    fn hint(&mut self, id: QuestionId, token: &str) {
        if let Some(question) = self.questions.iter_mut().find(|q| q.id() == id) {
            *question = question.clone().with_pairing_hint(token);
        }
    }

    fn build(self) -> Vec<Question> {
        self.questions
    }
}

fn quotas(values: [usize; Category::COUNT]) -> CategoryMap<usize> {
    CategoryMap::from_fn(|category| values[category.index()])
}

fn run(questions: Vec<Question>, config: AssemblyConfig) -> Result<PacketSet, PacketError> {
    PacketAssembler::new(config)?.assemble(questions)
}

fn adjacent_repeats(round: &Round) -> usize {
    round.categories().windows(2).filter(|w| w[0] == w[1]).count()
}

#[test]
fn exact_pool_fills_two_rounds_one_pair_per_category() {
    let mut pool = PoolBuilder::new(1);
    for category in Category::ALL {
        pool.add_pairs(category, 2);
    }
    let config = AssemblyConfig::new(quotas([1; 6]), 2).with_seed(42);
    let packets = run(pool.build(), config).expect("assembled");

    assert_eq!(packets.strategy(), Strategy::SortAndSlice);
    assert_eq!(packets.rounds().len(), 2);
    assert!(packets.tiebreaks().is_empty());
    assert!(packets.removed().is_empty());
    for round in packets.rounds() {
        assert_eq!(round.pairs().len(), 6);
        assert_eq!(round.category_counts(), quotas([1; 6]));
        let categories = round.categories();
        assert!(categories.windows(2).all(|w| w[0] != w[1]));
    }
}

#[test]
fn every_round_matches_quota_without_adjacent_repeats() {
    let per_round = [4, 4, 4, 4, 4, 3];
    let mut pool = PoolBuilder::new(2);
    for category in Category::ALL {
        pool.add_pairs(category, per_round[category.index()] * 3 + 2);
    }
    let config = AssemblyConfig::new(quotas(per_round), 3).with_seed(7);
    let packets = run(pool.build(), config).expect("assembled");

    assert_eq!(packets.rounds().len(), 3);
    for round in packets.rounds() {
        assert_eq!(round.category_counts(), quotas(per_round));
        assert_eq!(adjacent_repeats(round), 0, "round {}", round.number());
    }

    let removed = packets.removed_counts();
    for category in Category::ALL {
        assert_eq!(removed[category], 4, "{category}");
    }
}

fn assert_uneven_quotas_never_repeat(per_round: [usize; Category::COUNT]) {
    for seed in 0..25 {
        let mut pool = PoolBuilder::new(seed);
        for category in Category::ALL {
            pool.add_pairs(category, per_round[category.index()] * 2 + 1);
        }
        let config = AssemblyConfig::new(quotas(per_round), 2).with_seed(seed);
        let packets = run(pool.build(), config).expect("assembled");

        for round in packets.rounds() {
            assert_eq!(round.category_counts(), quotas(per_round));
            assert_eq!(
                adjacent_repeats(round),
                0,
                "seed {seed} round {}: {:?}",
                round.number(),
                round.categories()
            );
        }
    }
}

#[test]
fn uneven_quotas_never_place_a_category_twice_in_a_row() {
    assert_uneven_quotas_never_repeat([3, 3, 1, 1, 1, 1]);
}

#[test]
fn one_heavy_category_never_repeats() {
    assert_uneven_quotas_never_repeat([2, 1, 1, 1, 1, 1]);
}

#[test]
fn selection_leaves_equal_type_counts_per_category() {
    let mut pool = PoolBuilder::new(3);
    pool.add_pairs(Category::Biology, 5);
    pool.add(Category::Biology, QuestionType::TossUp, 3.0);
    pool.add(Category::Biology, QuestionType::TossUp, 3.5);
    pool.add_pairs(Category::Chemistry, 4);
    let config = AssemblyConfig::new(quotas([0, 2, 2, 0, 0, 0]), 2).with_seed(3);
    let packets = run(pool.build(), config).expect("assembled");

    let mut counts = [0usize; 2];
    for round in packets.rounds() {
        for (_, question) in round.questions() {
            if question.category() == Category::Biology {
                counts[question.kind().index()] += 1;
            }
        }
    }
    assert_eq!(counts, [4, 4]);
    assert_eq!(packets.removed().len(), 4);
}

#[test]
fn pairs_share_category_and_energy_subcategory() {
    let mut questions = Vec::new();
    let mut next = 1;
    for (idx, subcategory) in ["Nuclear", "Solar", "Nuclear", "Solar"].into_iter().enumerate() {
        for kind in QuestionType::BOTH {
            questions.push(
                Question::new(QuestionId(next), Category::Energy, kind)
                    .with_subcategory(subcategory)
                    .with_ratings(idx as f64, 3.0),
            );
            next += 1;
        }
    }
    for kind in [QuestionType::TossUp, QuestionType::Bonus].repeat(4) {
        questions.push(Question::new(QuestionId(next), Category::Math, kind).with_ratings(2.0, 3.0));
        next += 1;
    }
    let config = AssemblyConfig::new(quotas([2, 0, 0, 0, 0, 2]), 2).with_seed(5);
    let packets = run(questions, config).expect("assembled");

    for round in packets.rounds() {
        for pair in round.pairs() {
            assert_eq!(pair.tossup().kind(), QuestionType::TossUp);
            assert_eq!(pair.bonus().kind(), QuestionType::Bonus);
            assert_eq!(pair.tossup().category(), pair.bonus().category());
            assert_eq!(pair.tossup().subcategory(), pair.bonus().subcategory());
        }
    }
}

#[test]
fn oversized_energy_pool_is_trimmed_within_subcategories() {
    let energy = |id: usize, kind, subcategory: &str, quality: f64| {
        Question::new(QuestionId(id), Category::Energy, kind)
            .with_subcategory(subcategory)
            .with_ratings(2.0, quality)
    };
    let mut questions = vec![
        energy(1, QuestionType::TossUp, "Nuclear", 1.0),
        energy(2, QuestionType::TossUp, "Nuclear", 4.0),
        energy(3, QuestionType::TossUp, "Solar", 5.0),
        energy(4, QuestionType::Bonus, "Nuclear", 5.0),
        energy(5, QuestionType::Bonus, "Solar", 1.0),
        energy(6, QuestionType::Bonus, "Solar", 3.0),
    ];
    for (offset, kind) in [QuestionType::TossUp, QuestionType::Bonus].repeat(2).into_iter().enumerate() {
        questions.push(Question::new(QuestionId(7 + offset), Category::Math, kind).with_ratings(2.0, 3.0));
    }
    let config = AssemblyConfig::new(quotas([1, 0, 0, 0, 0, 1]), 2).with_seed(8);
    let packets = run(questions, config).expect("assembled");

    let mut removed: Vec<usize> = packets.removed().iter().map(|q| q.id().0).collect();
    removed.sort_unstable();
    assert_eq!(removed, vec![1, 5]);

    let mut energy_pairs = 0;
    for round in packets.rounds() {
        for pair in round.pairs().iter().filter(|p| p.category() == Category::Energy) {
            assert_eq!(pair.tossup().subcategory(), pair.bonus().subcategory());
            energy_pairs += 1;
        }
    }
    assert_eq!(energy_pairs, 2);
}

#[test]
fn three_extra_pairs_lose_their_lowest_quality_members() {
    let mut pool = PoolBuilder::new(4);
    for _ in 0..4 {
        pool.add(Category::Math, QuestionType::TossUp, 4.0);
        pool.add(Category::Math, QuestionType::Bonus, 4.0);
    }
    let mut weakest = BTreeSet::new();
    for quality in [0.5, 0.6, 0.7] {
        weakest.insert(pool.add(Category::Math, QuestionType::TossUp, quality));
        weakest.insert(pool.add(Category::Math, QuestionType::Bonus, quality + 0.05));
    }
    pool.add_pairs(Category::Physics, 4);
    let config = AssemblyConfig::new(quotas([2, 0, 0, 2, 0, 0]), 2).with_seed(11);
    let packets = run(pool.build(), config).expect("assembled");

    let removed: BTreeSet<QuestionId> = packets.removed().iter().map(Question::id).collect();
    assert_eq!(removed, weakest);
}

#[test]
fn forced_pair_survives_trimming_as_one_pair() {
    let mut pool = PoolBuilder::new(5);
    let tossup = pool.add(Category::Chemistry, QuestionType::TossUp, 4.9);
    let bonus = pool.add(Category::Chemistry, QuestionType::Bonus, 4.9);
    pool.hint(tossup, "titration");
    pool.hint(bonus, "titration");
    for _ in 0..2 {
        pool.add(Category::Chemistry, QuestionType::TossUp, 1.0);
        pool.add(Category::Chemistry, QuestionType::Bonus, 1.0);
    }
    let config = AssemblyConfig::new(quotas([0, 0, 1, 0, 0, 0]), 2).with_seed(8);
    let packets = run(pool.build(), config).expect("assembled");

    let bound: Vec<_> = packets
        .all_rounds()
        .flat_map(Round::pairs)
        .filter(|pair| pair.tossup().id() == tossup || pair.bonus().id() == bonus)
        .collect();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].tossup().id(), tossup);
    assert_eq!(bound[0].bonus().id(), bonus);
    assert!(bound[0].is_forced());
}

#[test]
fn forced_pair_is_removed_together() {
    let mut pool = PoolBuilder::new(6);
    let tossup = pool.add(Category::Physics, QuestionType::TossUp, 0.1);
    let bonus = pool.add(Category::Physics, QuestionType::Bonus, 4.9);
    pool.hint(tossup, "optics");
    pool.hint(bonus, "optics");
    for _ in 0..2 {
        pool.add(Category::Physics, QuestionType::TossUp, 3.0);
        pool.add(Category::Physics, QuestionType::Bonus, 3.0);
    }
    let config = AssemblyConfig::new(quotas([0, 0, 0, 1, 0, 0]), 2).with_seed(8);
    let packets = run(pool.build(), config).expect("assembled");

    let removed: BTreeSet<QuestionId> = packets.removed().iter().map(Question::id).collect();
    assert_eq!(removed, BTreeSet::from([tossup, bonus]));
}

#[test]
fn same_seed_reproduces_the_packet() {
    let build = || {
        let mut pool = PoolBuilder::new(9);
        for category in Category::ALL {
            pool.add_pairs(category, 8);
        }
        pool.build()
    };
    let config = || {
        AssemblyConfig::new(quotas([3, 3, 3, 3, 3, 2]), 2)
            .with_seed(2024)
            .with_jitter(Jitter::uniform(0.5))
    };

    let first = run(build(), config()).expect("first run");
    let second = run(build(), config()).expect("second run");
    assert_eq!(first.table_rows(), second.table_rows());
    assert_eq!(
        PacketSnapshot::to_json(&first, 2024).expect("json"),
        PacketSnapshot::to_json(&second, 2024).expect("json")
    );
}

#[test]
fn snapshot_json_reads_back_with_every_row() {
    let mut pool = PoolBuilder::new(10);
    for category in Category::ALL {
        pool.add_pairs(category, 3);
    }
    let config = AssemblyConfig::new(quotas([1; 6]), 2).with_seed(31);
    let packets = run(pool.build(), config).expect("assembled");

    let json = PacketSnapshot::to_json(&packets, 31).expect("json");
    let snapshot = PacketSnapshot::from_json(&json).expect("reads back");
    assert_eq!(snapshot.seed, 31);
    assert_eq!(snapshot.strategy, "sort-and-slice");
    assert_eq!(snapshot.round_count, 2);
    assert_eq!(snapshot.removed, 12);
    assert_eq!(snapshot.rows.len(), 36);

    let expected: Vec<(Option<String>, usize, String)> = packets
        .table_rows()
        .into_iter()
        .map(|row| (row.pair, row.source_row, row.status))
        .collect();
    let restored: Vec<(Option<String>, usize, String)> = snapshot
        .rows
        .into_iter()
        .map(|row| (row.pair, row.source_row, row.status))
        .collect();
    assert_eq!(restored, expected);
}

#[test]
fn multiple_choice_without_w_fails_before_pairing() {
    let record = QuestionRecord {
        kind: Some("Bonus".into()),
        category: Some("Physics".into()),
        format: Some("Multiple Choice".into()),
        multi_item: Some("No".into()),
        body: Some("Which quantity is conserved?".into()),
        answer: Some("X".into()),
        w: Some(String::new()),
        x: Some("Momentum".into()),
        y: Some("Heat".into()),
        z: Some("Entropy".into()),
        difficulty: Some("2".into()),
        quality: Some("3".into()),
        ..QuestionRecord::default()
    };
    let loaded: Result<Vec<Question>, PacketError> = vec![record]
        .into_iter()
        .enumerate()
        .map(|(idx, record)| record.into_question(QuestionId(idx + 1)).map_err(PacketError::from))
        .collect();
    assert_eq!(
        loaded,
        Err(PacketError::Schema(SchemaError::MissingChoice {
            row: QuestionId(1),
            letter: 'W'
        }))
    );
}

#[test]
fn undersized_category_is_a_quantity_error() {
    let mut pool = PoolBuilder::new(10);
    pool.add_pairs(Category::Physics, 3);
    pool.add(Category::Physics, QuestionType::Bonus, 3.0);
    let config = AssemblyConfig::new(quotas([0, 0, 0, 2, 0, 0]), 2);
    let err = run(pool.build(), config).expect_err("too few toss-ups");
    assert_eq!(
        err,
        PacketError::Quantity {
            category: Category::Physics,
            kind: QuestionType::TossUp,
            required: 4,
            available: 3,
        }
    );
}

#[test]
fn exported_rounds_reassemble_with_the_same_pairs() {
    let mut pool = PoolBuilder::new(12);
    for category in Category::ALL {
        pool.add_pairs(category, 5);
    }
    let config = || AssemblyConfig::new(quotas([2, 2, 2, 2, 2, 1]), 2);
    let first = run(pool.build(), config().with_seed(1)).expect("first run");

    let mut reloaded = Vec::new();
    for round in first.rounds() {
        for (pair, question) in round.questions() {
            let record = QuestionRecord::from_question(question, Some(round.number()), Some(pair.id().to_string()));
            let id = QuestionId(reloaded.len() + 1);
            reloaded.push(record.into_question(id).expect("reload"));
        }
    }
    let second = run(reloaded, config().with_seed(99)).expect("pass-through run");
    assert_eq!(second.strategy(), Strategy::PassThrough);

    let signature = |packets: &PacketSet| -> Vec<BTreeSet<(String, String)>> {
        packets
            .rounds()
            .iter()
            .map(|round| {
                round
                    .pairs()
                    .iter()
                    .map(|pair| (pair.tossup().body().to_string(), pair.bonus().body().to_string()))
                    .collect()
            })
            .collect()
    };
    assert_eq!(signature(&first), signature(&second));
}

fn preassigned(id: usize, category: Category, kind: QuestionType, round: u32) -> Question {
    Question::new(QuestionId(id), category, kind)
        .with_ratings(2.0, 3.0)
        .with_round(round)
}

fn full_preassigned_round(round: u32, first_id: usize) -> Vec<Question> {
    let mut questions = Vec::new();
    for (offset, category) in Category::ALL.into_iter().enumerate() {
        let id = first_id + offset * 2;
        let tossup = preassigned(id, category, QuestionType::TossUp, round);
        let bonus = preassigned(id + 1, category, QuestionType::Bonus, round);
        if category.requires_subcategory() {
            questions.push(tossup.with_subcategory("Solar"));
            questions.push(bonus.with_subcategory("Solar"));
        } else {
            questions.push(tossup);
            questions.push(bonus);
        }
    }
    questions
}

#[test]
fn preassigned_tiebreaks_skip_quota_checks() {
    let mut questions = full_preassigned_round(1, 1);
    questions.push(preassigned(100, Category::Math, QuestionType::TossUp, 21));
    questions.push(preassigned(101, Category::Math, QuestionType::Bonus, 21));
    questions.push(preassigned(102, Category::Physics, QuestionType::TossUp, 21));
    questions.push(preassigned(103, Category::Physics, QuestionType::Bonus, 21));

    let packets = run(questions, AssemblyConfig::new(quotas([1; 6]), 1)).expect("assembled");
    assert_eq!(packets.rounds().len(), 1);
    assert_eq!(packets.tiebreaks().len(), 1);
    let tiebreak = &packets.tiebreaks()[0];
    assert_eq!(tiebreak.number(), 21);
    assert_eq!(tiebreak.kind(), RoundKind::Tiebreak(1));
    assert_eq!(tiebreak.pairs().len(), 2);
}

#[test]
fn preassigned_round_outside_layout_is_rejected() {
    let mut questions = full_preassigned_round(1, 1);
    questions.push(preassigned(100, Category::Math, QuestionType::TossUp, 15));
    questions.push(preassigned(101, Category::Math, QuestionType::Bonus, 15));
    let err = run(questions, AssemblyConfig::new(quotas([1; 6]), 1)).expect_err("round 15");
    assert!(matches!(err, PacketError::Consistency { context, .. } if context == "round 15"));
}

#[test]
fn preassigned_quota_mismatch_is_rejected() {
    let mut questions = full_preassigned_round(1, 1);
    questions.push(preassigned(100, Category::Math, QuestionType::TossUp, 1));
    questions.push(preassigned(101, Category::Math, QuestionType::Bonus, 1));
    let err = run(questions, AssemblyConfig::new(quotas([1; 6]), 1)).expect_err("two math pairs");
    assert!(matches!(err, PacketError::Consistency { .. }));
}

#[test]
fn partial_round_column_is_a_schema_error() {
    let questions = vec![
        preassigned(1, Category::Math, QuestionType::TossUp, 1),
        Question::new(QuestionId(2), Category::Math, QuestionType::Bonus),
    ];
    let err = run(questions, AssemblyConfig::new(quotas([1, 0, 0, 0, 0, 0]), 1)).expect_err("mixed");
    assert!(matches!(err, PacketError::Schema(SchemaError::MixedRoundColumn { .. })));
}

#[test]
fn single_category_rounds_are_infeasible() {
    let mut pool = PoolBuilder::new(13);
    pool.add_pairs(Category::Math, 2);
    let mut config = AssemblyConfig::new(quotas([2, 0, 0, 0, 0, 0]), 1);
    config.arranger.max_attempts = 10;
    let err = run(pool.build(), config).expect_err("math only");
    assert!(matches!(err, PacketError::Infeasible { round: 1, .. }));
}

use crate::config::Config;

/// Extraction class of one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicClass {
    Camera,
    Laser,
    CloudMeta,
    CloudPacket,
    Generic,
}

/// Classify one topic, priority order: camera set, range scan, cloud
/// metadata, cloud packets, everything else generic. `None` drops the topic
/// entirely (camera parsing disabled, or an ignored channel).
pub fn classify(cfg: &Config, topic: &str) -> Option<TopicClass> {
    if cfg.camera_topics.iter().any(|t| t == topic) {
        return cfg.parse_cameras.then_some(TopicClass::Camera);
    }
    if cfg.ignore_topics.iter().any(|t| t == topic) {
        return None;
    }
    if cfg.laser_topics.iter().any(|t| t == topic) {
        return Some(TopicClass::Laser);
    }
    if topic == cfg.cloud_meta_topic {
        return Some(TopicClass::CloudMeta);
    }
    if topic == cfg.cloud_packet_topic {
        return Some(TopicClass::CloudPacket);
    }
    Some(TopicClass::Generic)
}

/// Deterministic output file name for a topic: slashes become a literal
/// marker, extension fixed per class.
pub fn output_name(topic: &str, class: TopicClass) -> String {
    let stem = topic.replace('/', "_slash_");
    match class {
        TopicClass::Generic => format!("{stem}.csv"),
        _ => format!("{stem}.txt"),
    }
}

/// Route the topic set of one log file, in stable name order.
pub fn routing_table(cfg: &Config, topics: &[String]) -> Vec<(String, TopicClass)> {
    let mut routed: Vec<(String, TopicClass)> = topics
        .iter()
        .filter_map(|t| classify(cfg, t).map(|class| (t.clone(), class)))
        .collect();
    routed.sort_by(|a, b| a.0.cmp(&b.0));
    routed
}

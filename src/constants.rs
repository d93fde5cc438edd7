// Server defaults
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BASE_URL: &str = "https://reactome.org";
pub const SERVICE_NAME: &str = "content-service";

// External registries
pub const PSICQUIC_REGISTRY_URL: &str =
    "https://www.ebi.ac.uk/Tools/webservices/psicquic/registry/registry?action=ACTIVE&format=txt";

// Query limits
pub const MAX_IDS_PER_QUERY: usize = 20;
pub const MAX_SCHEMA_PAGE_SIZE: usize = 25;
pub const MAX_SCHEMA_MIN_PAGE_SIZE: usize = 20_000;
pub const DEFAULT_INTERACTORS_PAGE_SIZE: usize = 100;

// Resources
pub const STATIC_RESOURCE: &str = "static";
pub const INTACT_ACCESSION_URL: &str = "https://www.ebi.ac.uk/intact/search?query=";
pub const UNIPROT_ACCESSION_URL: &str = "https://www.uniprot.org/uniprot/";

// Schema classes used by the traversal services
pub const TOP_LEVEL_PATHWAY: &str = "TopLevelPathway";
pub const PATHWAY: &str = "Pathway";
pub const EVENT: &str = "Event";
pub const REACTION_LIKE_EVENT: &str = "ReactionLikeEvent";
pub const PHYSICAL_ENTITY: &str = "PhysicalEntity";
pub const COMPLEX: &str = "Complex";
pub const ENTITY_SET: &str = "EntitySet";
pub const POLYMER: &str = "Polymer";
pub const SPECIES: &str = "Species";
pub const PERSON: &str = "Person";
pub const INSTANCE_EDIT: &str = "InstanceEdit";
pub const PUBLICATION: &str = "Publication";
pub const REFERENCE_ENTITY: &str = "ReferenceEntity";
pub const DISEASE: &str = "Disease";
pub const INTERACTION: &str = "Interaction";

// Relationship names
pub const HAS_EVENT: &str = "hasEvent";
pub const INPUT: &str = "input";
pub const OUTPUT: &str = "output";
pub const CATALYST_ACTIVITY: &str = "catalystActivity";
pub const PHYSICAL_ENTITY_REL: &str = "physicalEntity";
pub const REGULATED_BY: &str = "regulatedBy";
pub const REGULATOR: &str = "regulator";
pub const HAS_COMPONENT: &str = "hasComponent";
pub const HAS_MEMBER: &str = "hasMember";
pub const HAS_CANDIDATE: &str = "hasCandidate";
pub const REPEATED_UNIT: &str = "repeatedUnit";
pub const REFERENCE_ENTITY_REL: &str = "referenceEntity";
pub const SPECIES_REL: &str = "species";
pub const INFERRED_TO: &str = "inferredTo";
pub const AUTHORED: &str = "authored";
pub const AUTHOR: &str = "author";
pub const INTERACTOR: &str = "interactor";
pub const SUMMATION_REL: &str = "summation";
pub const LITERATURE_REFERENCE_REL: &str = "literatureReference";

/// Relations that make a physical entity part of a larger structure.
pub const STRUCTURE_RELATIONS: &[&str] = &[HAS_COMPONENT, HAS_MEMBER, HAS_CANDIDATE, REPEATED_UNIT];

/// Relations from a reaction-like event to the entities it consumes or produces.
pub const PARTICIPANT_RELATIONS: &[&str] = &[INPUT, OUTPUT];

// Cross-reference urls
pub const CHEBI_ACCESSION_URL: &str = "https://www.ebi.ac.uk/chebi/searchId.do?chebiId=CHEBI:";
pub const ORCID_URL: &str = "https://orcid.org/";
pub const DOI_URL: &str = "https://doi.org/";

pub const STATIC_CITATION_PUBLISHER: &str = "Reactome";

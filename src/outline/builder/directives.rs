//! Library, import, export and part directives.

use smol_str::SmolStr;
use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::base::{FileId, TextSize};

use super::BuilderFactory;
use crate::outline::diagnostics::Template;
use crate::outline::directives::{
    DART_EXT_PREFIX, Export, ExportDirective, Exporter, Import, ImportDirective, Part, PartDirective, PartOf,
    PartOfDirective, select_configuration,
};
use crate::outline::error::BuildResult;
use crate::outline::unit::LoadRequest;
use crate::outline::uri::{DirectiveUri, resolve_directive_uri, try_resolve};

impl BuilderFactory<'_> {
    pub fn add_library_name(&mut self, name: impl Into<SmolStr>, offset: TextSize) -> BuildResult<()> {
        let name = name.into();
        self.guard("add_library_name", |this| {
            tracing::debug!(%name, ?offset, "library name");
            this.directives.library_name = Some(name);
            Ok(())
        })
    }

    /// `#!` line at the top of the unit.
    pub fn add_script_tag(&mut self, offset: TextSize) -> BuildResult<()> {
        self.guard("add_script_tag", |this| {
            this.directives.script_tag = Some(offset);
            Ok(())
        })
    }

    fn resolve_uri(&mut self, raw: &str, uri_offset: TextSize, is_part: bool) -> DirectiveUri {
        resolve_directive_uri(
            &self.unit.import_uri,
            raw,
            uri_offset,
            is_part,
            self.file,
            &mut self.diagnostics,
        )
    }

    fn load(&self, uri: &DirectiveUri, file_uri: Option<&Url>, offset: TextSize) -> Option<FileId> {
        let uri = uri.as_url()?;
        Some(self.ctx.loader().read(LoadRequest {
            uri,
            file_uri,
            origin: Some(self.file),
            offset,
        }))
    }

    /// Resolve an import, picking the configuration the environment selects.
    /// Returns the imported unit; `dart-ext:` and malformed imports have none.
    pub fn add_import(&mut self, directive: ImportDirective) -> BuildResult<Option<FileId>> {
        self.guard("add_import", |this| {
            if directive.is_deferred && directive.prefix.is_none() {
                this.report(Template::MissingPrefixInDeferredImport, directive.import_offset, 6);
            }

            let raw = SmolStr::new(select_configuration(
                &directive.uri,
                &directive.configurations,
                this.ctx.environment(),
            ));

            let (uri, native_path, target) = match raw.strip_prefix(DART_EXT_PREFIX) {
                Some(stripped) => {
                    this.report(Template::UnsupportedDartExt, directive.import_offset, 6);
                    let (uri, native_path) = this.resolve_native(&raw, stripped, directive.uri_offset);
                    (uri, Some(native_path), None)
                }
                None => {
                    let uri = this.resolve_uri(&raw, directive.uri_offset, false);
                    let target = this.load(&uri, None, directive.uri_offset);
                    (uri, None, target)
                }
            };

            tracing::debug!(%uri, prefix = ?directive.prefix, deferred = directive.is_deferred, "import");
            this.directives.imports.push(Import {
                target,
                uri,
                prefix: directive.prefix,
                prefix_offset: directive.prefix_offset,
                is_deferred: directive.is_deferred,
                combinators: directive.combinators,
                import_offset: directive.import_offset,
                uri_offset: directive.uri_offset,
                native_path,
            });
            Ok(target)
        })
    }

    /// `dart-ext:package:...` keeps the translated file path; anything else
    /// keeps the raw text.
    fn resolve_native(&mut self, raw: &str, stripped: &str, uri_offset: TextSize) -> (DirectiveUri, SmolStr) {
        if stripped.starts_with("package") {
            let offset = uri_offset + TextSize::from(DART_EXT_PREFIX.len() as u32);
            let uri = self.resolve_uri(stripped, offset, false);
            return match uri {
                DirectiveUri::Resolved(url) => {
                    let url = self.ctx.translator().translate(&url).unwrap_or(url);
                    let native_path = SmolStr::new(url.as_str());
                    (DirectiveUri::Resolved(url), native_path)
                }
                malformed => (malformed, SmolStr::new(stripped)),
            };
        }
        let encoded: String = byte_serialize(raw.as_bytes()).collect();
        let uri = match Url::parse(&format!("{DART_EXT_PREFIX}{encoded}")) {
            Ok(url) => DirectiveUri::Resolved(url),
            Err(_) => DirectiveUri::Malformed(SmolStr::new(raw)),
        };
        (uri, SmolStr::new(raw))
    }

    /// Resolve an export and register this unit as an exporter of the target.
    pub fn add_export(&mut self, directive: ExportDirective) -> BuildResult<Option<FileId>> {
        self.guard("add_export", |this| {
            let raw = SmolStr::new(select_configuration(
                &directive.uri,
                &directive.configurations,
                this.ctx.environment(),
            ));
            let uri = this.resolve_uri(&raw, directive.uri_offset, false);
            let target = this.load(&uri, None, directive.uri_offset);
            if let Some(target) = target {
                this.ctx.register_exporter(
                    target,
                    Exporter {
                        exporter: this.file,
                        combinators: directive.combinators.clone(),
                        offset: directive.export_offset,
                    },
                );
            }

            tracing::debug!(%uri, ?target, "export");
            this.directives.exports.push(Export {
                target,
                uri,
                combinators: directive.combinators,
                export_offset: directive.export_offset,
                uri_offset: directive.uri_offset,
            });
            Ok(target)
        })
    }

    /// Resolve a part. Its file URI comes from the translator, else from
    /// resolving against this unit's file URI.
    pub fn add_part(&mut self, directive: PartDirective) -> BuildResult<Option<FileId>> {
        self.guard("add_part", |this| {
            let uri = this.resolve_uri(&directive.uri, directive.uri_offset, true);
            if uri.as_url() == Some(&this.unit.import_uri) {
                this.report(Template::PartOfSelf, directive.part_offset, 4);
                return Ok(None);
            }

            let file_uri = match uri.as_url() {
                Some(url) => this
                    .ctx
                    .translator()
                    .translate(url)
                    .or_else(|| try_resolve(&this.unit.file_uri, &directive.uri, true).ok()),
                None => None,
            };
            let target = this.load(&uri, file_uri.as_ref(), directive.uri_offset);

            tracing::debug!(%uri, ?target, "part");
            this.directives.parts.push(Part {
                target,
                uri,
                file_uri,
                part_offset: directive.part_offset,
                uri_offset: directive.uri_offset,
            });
            Ok(target)
        })
    }

    /// Record `part of`. A unit may name its library once, and never itself.
    pub fn add_part_of(&mut self, directive: PartOfDirective) -> BuildResult<()> {
        self.guard("add_part_of", |this| {
            if this.directives.part_of.is_some() {
                this.report(Template::PartOfTwice, directive.offset, 4);
                return Ok(());
            }
            let uri = match &directive.uri {
                Some(raw) => Some(this.resolve_uri(raw, directive.uri_offset, false)),
                None => None,
            };
            if let Some(uri) = &uri {
                if uri.as_url() == Some(&this.unit.import_uri) {
                    this.report(Template::PartOfSelf, directive.offset, 4);
                }
            }

            tracing::debug!(uri = ?uri.as_ref().map(ToString::to_string), name = ?directive.name, "part of");
            this.directives.part_of = Some(PartOf {
                uri,
                name: directive.name,
                offset: directive.offset,
            });
            Ok(())
        })
    }
}
